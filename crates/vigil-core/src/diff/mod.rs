//! Snapshot change-set computation.
//!
//! ## Entry point
//!
//! ```ignore
//! use vigil_core::diff::compute_change_set;
//!
//! let change_set = compute_change_set(Some(&previous), &current)?;
//! let summary = vigil_core::diff::render_human_summary(&change_set);
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: the same two snapshots always produce the same change set.
//! - **Ordering**: entries follow current-snapshot order; removals follow
//!   previous-snapshot order.
//! - **Baseline**: with no previous snapshot nothing counts as a change.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::compute_change_set;
pub use human_summary::render_human_summary;
pub use model::{ChangeSet, InstanceChange, InstanceChangeKind, StatusChange};
