//! SnapshotWatcher
//!
//! Turns writes to the status document into a debounced stream of
//! [`WatchEvent`]s. The watcher never parses the document; it only says
//! "something changed, go and load it".
//!
//! Raw change signals come from one of two sources:
//! - `notify`: filesystem notifications on the document's parent directory,
//!   so that atomic replace-by-rename is seen as well as in-place writes
//! - `poll`: periodic metadata comparison (modification time and length)
//!
//! A burst of raw signals closer together than the debounce window is
//! delivered as a single event once the burst goes quiet.

mod debounce;
mod sources;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WatchConfig;
use crate::errors::Result;

pub use debounce::Debouncer;

const EVENT_BUFFER: usize = 16;

/// Where raw change signals come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    #[default]
    Notify,
    Poll,
}

/// One debounced "the document changed" signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    /// Raw signals folded into this event
    pub raw_signals: usize,
}

/// Factory for watch streams over one document path
#[derive(Debug, Clone)]
pub struct SnapshotWatcher {
    path: PathBuf,
    mode: WatchMode,
    debounce: Duration,
    poll_interval: Duration,
}

impl SnapshotWatcher {
    pub fn new(
        path: impl Into<PathBuf>,
        mode: WatchMode,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            mode,
            debounce,
            poll_interval,
        }
    }

    pub fn from_config(path: &Path, config: &WatchConfig) -> Self {
        Self::new(path, config.mode, config.debounce(), config.poll_interval())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Begin watching. Each call yields an independent stream, so a caller
    /// can drop a broken stream and start again.
    ///
    /// # Errors
    ///
    /// `Io` when the filesystem watch cannot be installed.
    pub fn start(&self) -> Result<WatchStream> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let source = match self.mode {
            WatchMode::Notify => sources::spawn_notify(&self.path, raw_tx)?,
            WatchMode::Poll => sources::spawn_poll(self.path.clone(), self.poll_interval, raw_tx),
        };

        let debouncer = tokio::spawn(Debouncer::new(self.debounce).run(raw_rx, event_tx));

        tracing::info!(
            path = %self.path.display(),
            mode = ?self.mode,
            debounce_ms = self.debounce.as_millis() as u64,
            "Watching snapshot"
        );

        Ok(WatchStream {
            events: event_rx,
            _source: source,
            debouncer,
        })
    }
}

/// A running watch; dropping it stops the watch
pub struct WatchStream {
    events: mpsc::Receiver<WatchEvent>,
    _source: sources::SourceGuard,
    debouncer: JoinHandle<()>,
}

impl WatchStream {
    /// Next debounced event; `None` once the underlying source has failed
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

impl Drop for WatchStream {
    fn drop(&mut self) {
        self.debouncer.abort();
    }
}
