//! Snapshot domain model
//!
//! A [`Snapshot`] is one complete, timestamped read of facility status. It is
//! built once per load and never mutated; a newer snapshot supersedes it as a
//! whole.

pub mod snapshot;
pub mod status;

pub use snapshot::{Facility, Instance, Snapshot, DEFAULT_REFRESH_INTERVAL_SECS};
pub use status::{summarize_status, FacilityStatus};
