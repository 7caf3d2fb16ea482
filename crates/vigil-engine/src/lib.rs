//! Vigil Engine - orchestration and channel adapters
//!
//! Provides:
//! - The `ChannelAdapter` contract every messaging backend satisfies
//! - Admin command gating and dispatch
//! - Per-adapter supervision with reconnect backoff
//! - The Orchestrator driving watch -> load -> diff -> policy -> deliver
//! - Bundled console, webhook and IRC adapters

pub mod adapter;
pub mod adapters;
pub mod backoff;
pub mod commands;
pub mod errors;
pub mod orchestrator;
pub mod supervisor;

pub use adapter::{AdapterState, Alert, ChannelAdapter, Delivery};
pub use adapters::{build_adapter, build_registrations};
pub use backoff::Backoff;
pub use commands::{CommandDispatch, CommandGate, SenderIdentity};
pub use errors::AdapterError;
pub use orchestrator::{
    AlertOutcome, ChangeSource, CycleOutcome, DeliveryOutcome, DeliveryStatus, Orchestrator,
    OrchestratorSettings, Phase, Registration, WatchSource,
};
pub use supervisor::AdapterEvent;
