//! Vigil Store - everything that reads from disk
//!
//! Provides:
//! - SnapshotStore: load, validate and digest the status document
//! - Configuration loading and validation
//! - SnapshotWatcher: filesystem notifications or polling, debounced

pub mod config;
pub mod errors;
pub mod snapshot;
pub mod watcher;

// Re-export key types
pub use config::Config;
pub use errors::Result;
pub use snapshot::{SnapshotStore, SUPPORTED_FORMAT_VERSION};
pub use watcher::{SnapshotWatcher, WatchEvent, WatchMode};
