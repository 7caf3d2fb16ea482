//! Channel adapter contract
//!
//! Every messaging backend implements [`ChannelAdapter`]. The supervisor owns
//! the connection lifecycle (`connect` then `serve` until the transport is
//! lost, reconnect with backoff, `disconnect` on shutdown); the orchestrator
//! only ever calls `deliver`.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected   (transport lost)
//!                                         -> Stopping -> Disconnected
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vigil_core::render::{build_report_view, render_plain_lines, RenderOptions, ReportView};
use vigil_core::{ChangeSet, RenderDecision, Snapshot};
use vigil_core_types::CycleId;

use crate::commands::CommandDispatch;
use crate::errors::AdapterError;

/// Connection state of one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Disconnected,
    Connecting,
    Connected,
    Stopping,
}

impl AdapterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterState::Disconnected => "disconnected",
            AdapterState::Connecting => "connecting",
            AdapterState::Connected => "connected",
            AdapterState::Stopping => "stopping",
        }
    }
}

/// Everything an adapter needs to render and send one notification.
///
/// Snapshot and change set are shared read-only views; an adapter never
/// sees orchestrator state directly.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub cycle_id: CycleId,
    pub decision: RenderDecision,
    pub change_set: Arc<ChangeSet>,
    pub snapshot: Arc<Snapshot>,
    pub destinations: Arc<[String]>,
    pub options: Arc<RenderOptions>,
    pub rendered_at: DateTime<Utc>,
}

impl Delivery {
    /// Structured report, or `None` for a suppress decision
    pub fn report_view(&self) -> Option<ReportView> {
        build_report_view(
            self.decision,
            &self.change_set,
            &self.snapshot,
            &self.options,
            self.rendered_at,
        )
    }

    /// Report as plain text lines; empty for a suppress decision
    pub fn plain_lines(&self) -> Vec<String> {
        self.report_view()
            .map(|view| render_plain_lines(&view))
            .unwrap_or_default()
    }
}

/// A short operational notice sent instead of a report, e.g. when the
/// status document could not be loaded
#[derive(Debug, Clone)]
pub struct Alert {
    pub cycle_id: CycleId,
    pub text: String,
    pub destinations: Arc<[String]>,
}

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Unique registration name
    fn name(&self) -> &str;

    /// Backend kind, for logs
    fn kind(&self) -> &'static str;

    /// Establish the transport and run backend setup, strictly in order:
    /// authenticate, post-login commands, join delay, join destinations.
    async fn connect(&self) -> Result<(), AdapterError>;

    /// Drive a connected session until its transport is lost.
    ///
    /// Inbound admin commands go through `commands`. Backends without inbound
    /// traffic simply wait.
    async fn serve(&self, commands: CommandDispatch) -> Result<(), AdapterError>;

    /// Render `delivery` and send it to each of its destinations, once.
    async fn deliver(&self, delivery: &Delivery) -> Result<(), AdapterError>;

    /// Send `alert` to each of its destinations, once.
    async fn deliver_alert(&self, alert: &Alert) -> Result<(), AdapterError>;

    /// Release the transport. Safe to call when already disconnected.
    async fn disconnect(&self);
}
