//! Raw change-signal sources.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::{watch_error, Result};

/// Keeps a source alive; dropping it stops the source
pub(crate) enum SourceGuard {
    /// Watching stops when the watcher is dropped
    Notify { _watcher: RecommendedWatcher },
    Poll(JoinHandle<()>),
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        if let SourceGuard::Poll(handle) = self {
            handle.abort();
        }
    }
}

pub(crate) fn spawn_notify(path: &Path, raw: UnboundedSender<()>) -> Result<SourceGuard> {
    let file_name: OsString = path
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| watch_error(path, "path has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_relevant(&event, &file_name) => {
            let _ = raw.send(());
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "Filesystem watch error"),
    })
    .map_err(|e| watch_error(path, e))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| watch_error(path, e))?;

    Ok(SourceGuard::Notify { _watcher: watcher })
}

fn is_relevant(event: &Event, file_name: &OsStr) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name))
}

type Fingerprint = Option<(Option<SystemTime>, u64)>;

async fn fingerprint(path: &Path) -> Fingerprint {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some((meta.modified().ok(), meta.len()))
}

pub(crate) fn spawn_poll(path: PathBuf, interval: Duration, raw: UnboundedSender<()>) -> SourceGuard {
    let handle = tokio::spawn(async move {
        let mut last = fingerprint(&path).await;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let current = fingerprint(&path).await;
            if current != last {
                last = current;
                if raw.send(()).is_err() {
                    break;
                }
            }
        }
    });
    SourceGuard::Poll(handle)
}
