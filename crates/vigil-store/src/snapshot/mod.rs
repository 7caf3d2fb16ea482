//! SnapshotStore
//!
//! Reads the status document, checks its format version, converts it into a
//! validated [`vigil_core::Snapshot`] and stamps it with a content digest.

pub mod digest;
pub mod format_v1;
pub mod loader;

pub use digest::content_digest;
pub use format_v1::SUPPORTED_FORMAT_VERSION;
pub use loader::{load_snapshot_file, parse_snapshot_bytes, SnapshotStore};
