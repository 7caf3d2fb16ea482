//! Change sources feeding the orchestrator loop

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use vigil_store::watcher::WatchStream;
use vigil_store::{SnapshotWatcher, WatchEvent};

const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Stream of "the snapshot may have changed" signals
#[async_trait]
pub trait ChangeSource: Send {
    /// Wait for the next change. `None` means the source is gone for good.
    async fn next_change(&mut self) -> Option<WatchEvent>;
}

#[async_trait]
impl ChangeSource for mpsc::Receiver<WatchEvent> {
    async fn next_change(&mut self) -> Option<WatchEvent> {
        self.recv().await
    }
}

/// [`SnapshotWatcher`] that restarts its stream whenever the stream dies
pub struct WatchSource {
    watcher: SnapshotWatcher,
    stream: Option<WatchStream>,
    restart_delay: Duration,
}

impl WatchSource {
    pub fn new(watcher: SnapshotWatcher) -> Self {
        Self {
            watcher,
            stream: None,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }
}

#[async_trait]
impl ChangeSource for WatchSource {
    async fn next_change(&mut self) -> Option<WatchEvent> {
        loop {
            if self.stream.is_none() {
                match self.watcher.start() {
                    Ok(stream) => self.stream = Some(stream),
                    Err(err) => {
                        tracing::error!(
                            error = %err,
                            err.code = err.code(),
                            path = %self.watcher.path().display(),
                            "Failed to start snapshot watch, retrying"
                        );
                        tokio::time::sleep(self.restart_delay).await;
                        continue;
                    }
                }
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            match stream.next().await {
                Some(event) => return Some(event),
                None => {
                    tracing::warn!(
                        path = %self.watcher.path().display(),
                        "Snapshot watch stopped, restarting"
                    );
                    self.stream = None;
                    tokio::time::sleep(self.restart_delay).await;
                }
            }
        }
    }
}
