//! Core types shared across vigil facilities
//!
//! This crate provides foundational types used by the error, logging and
//! pipeline facilities:
//!
//! - **Correlation types**: CycleId for tying log lines to one pipeline pass
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::CycleId;
pub use sensitive::Sensitive;
