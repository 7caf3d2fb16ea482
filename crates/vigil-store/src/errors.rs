//! Error handling for vigil-store
//!
//! Wraps vigil-core VgError with store-specific helpers

use std::path::Path;

use vigil_core::errors::{VgError, VgErrorKind};

/// Result type alias using VgError
pub type Result<T> = std::result::Result<T, VgError>;

/// Create a configuration error
pub fn config_error(path: &Path, reason: impl Into<String>) -> VgError {
    VgError::new(VgErrorKind::Config)
        .with_op("load_config")
        .with_path(path.display().to_string())
        .with_message(reason)
}

/// Create a snapshot read error
pub fn snapshot_read_error(path: &Path, err: std::io::Error) -> VgError {
    VgError::new(VgErrorKind::SnapshotLoad)
        .with_op("load_snapshot")
        .with_path(path.display().to_string())
        .with_message(format!("Failed to read snapshot: {}", err))
}

/// Create a watcher setup error
pub fn watch_error(path: &Path, reason: impl std::fmt::Display) -> VgError {
    VgError::new(VgErrorKind::Io)
        .with_op("watch_snapshot")
        .with_path(path.display().to_string())
        .with_message(format!("Failed to watch snapshot: {}", reason))
}
