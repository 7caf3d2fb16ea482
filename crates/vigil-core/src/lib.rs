//! Vigil Core - status snapshot model and pure change logic
//!
//! This crate holds everything the monitor computes without touching the
//! outside world:
//! - Snapshot, facility and instance models with identity validation
//! - The change-set diff between two snapshots
//! - The notification policy deciding what, if anything, to render
//! - Report rendering into channel-neutral text lines
//! - The error and logging facilities shared by every vigil crate

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod policy;
pub mod render;

// Macros resolve schema constants through this path.
pub use vigil_core_types;

pub use diff::{compute_change_set, ChangeSet};
pub use errors::{Result, SnapshotError, VgError, VgErrorKind};
pub use model::{Facility, FacilityStatus, Instance, Snapshot};
pub use policy::{decide, NotificationMode, RenderDecision};
pub use render::{build_report_view, render_plain_lines, RenderOptions, ReportView};
