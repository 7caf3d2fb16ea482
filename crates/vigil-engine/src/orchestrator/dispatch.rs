//! Fan-out of one evaluated change set to the registered adapters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use vigil_core::errors::{VgError, VgErrorKind};
use vigil_core::render::RenderOptions;
use vigil_core::{
    decide, log_op_end, log_op_error, ChangeSet, NotificationMode, RenderDecision, Snapshot,
};
use vigil_core_types::CycleId;

use super::Registered;
use crate::adapter::{AdapterState, Alert, Delivery};

const OP_DELIVER: &str = "deliver";
const OP_ALERT: &str = "deliver_alert";

#[derive(Debug, Clone)]
pub enum DeliveryStatus {
    Delivered,
    /// The policy decided there was nothing to say
    Suppressed,
    /// The adapter was not connected; it misses this pass
    NotConnected,
    Failed(VgError),
    TimedOut,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Suppressed => "suppressed",
            DeliveryStatus::NotConnected => "not_connected",
            DeliveryStatus::Failed(_) => "failed",
            DeliveryStatus::TimedOut => "timed_out",
        }
    }
}

/// What happened to one adapter during one pass
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub adapter: String,
    pub decision: RenderDecision,
    pub status: DeliveryStatus,
}

pub(super) struct DispatchRequest<'a> {
    pub cycle_id: &'a CycleId,
    pub change_set: Arc<ChangeSet>,
    pub snapshot: Arc<Snapshot>,
    pub options: Arc<RenderOptions>,
    pub is_initial_baseline: bool,
    pub timeout: Duration,
}

/// Evaluate the policy for every target and run the resulting deliveries
/// concurrently, each bounded by the request timeout.
pub(super) async fn dispatch<'r>(
    request: DispatchRequest<'_>,
    targets: impl Iterator<Item = &'r Registered>,
) -> Vec<DeliveryOutcome> {
    let rendered_at = Utc::now();

    let attempts = targets.map(|registered| {
        // An adapter whose last delivery failed starts over as if new.
        let decision = decide(
            &request.change_set,
            registered.mode,
            request.is_initial_baseline || registered.rebaseline,
        );
        let connected = *registered.state.borrow() == AdapterState::Connected;
        let adapter = Arc::clone(&registered.adapter);
        let delivery = Delivery {
            cycle_id: request.cycle_id.clone(),
            decision,
            change_set: Arc::clone(&request.change_set),
            snapshot: Arc::clone(&request.snapshot),
            destinations: Arc::clone(&registered.destinations),
            options: Arc::clone(&request.options),
            rendered_at,
        };
        let timeout = request.timeout;

        async move {
            let name = adapter.name().to_string();
            let status = if decision.is_suppress() {
                DeliveryStatus::Suppressed
            } else if !connected {
                DeliveryStatus::NotConnected
            } else {
                let started = Instant::now();
                let status = match tokio::time::timeout(timeout, adapter.deliver(&delivery)).await
                {
                    Ok(Ok(())) => DeliveryStatus::Delivered,
                    Ok(Err(err)) => DeliveryStatus::Failed(
                        VgError::from(err).with_op(OP_DELIVER).with_adapter(&name),
                    ),
                    Err(_) => DeliveryStatus::TimedOut,
                };
                log_delivery(OP_DELIVER, &delivery.cycle_id, &name, &status, started);
                status
            };

            DeliveryOutcome {
                adapter: name,
                decision,
                status,
            }
        }
    });

    let outcomes = join_all(attempts).await;
    for outcome in &outcomes {
        match outcome.status {
            DeliveryStatus::Suppressed => tracing::debug!(
                cycle_id = %request.cycle_id,
                adapter = %outcome.adapter,
                "Delivery suppressed by policy"
            ),
            DeliveryStatus::NotConnected => tracing::warn!(
                cycle_id = %request.cycle_id,
                adapter = %outcome.adapter,
                decision = ?outcome.decision,
                "Adapter not connected, skipping delivery"
            ),
            _ => {}
        }
    }
    outcomes
}

/// What happened to one adapter's alert
#[derive(Debug, Clone)]
pub struct AlertOutcome {
    pub adapter: String,
    pub status: DeliveryStatus,
}

/// Send `text` to every connected target whose mode wants to hear about
/// problems. Strict adapters only ever hear about changes.
pub(super) async fn dispatch_alert<'r>(
    cycle_id: &CycleId,
    text: &str,
    timeout: Duration,
    targets: impl Iterator<Item = &'r Registered>,
) -> Vec<AlertOutcome> {
    let attempts = targets.map(|registered| {
        let wants_alert = registered.mode != NotificationMode::ChangesOnlyStrict;
        let connected = *registered.state.borrow() == AdapterState::Connected;
        let adapter = Arc::clone(&registered.adapter);
        let alert = Alert {
            cycle_id: cycle_id.clone(),
            text: text.to_string(),
            destinations: Arc::clone(&registered.destinations),
        };

        async move {
            let name = adapter.name().to_string();
            let status = if !wants_alert {
                DeliveryStatus::Suppressed
            } else if !connected {
                DeliveryStatus::NotConnected
            } else {
                let started = Instant::now();
                let status =
                    match tokio::time::timeout(timeout, adapter.deliver_alert(&alert)).await {
                        Ok(Ok(())) => DeliveryStatus::Delivered,
                        Ok(Err(err)) => DeliveryStatus::Failed(
                            VgError::from(err).with_op(OP_ALERT).with_adapter(&name),
                        ),
                        Err(_) => DeliveryStatus::TimedOut,
                    };
                log_delivery(OP_ALERT, &alert.cycle_id, &name, &status, started);
                status
            };
            AlertOutcome {
                adapter: name,
                status,
            }
        }
    });

    join_all(attempts).await
}

fn log_delivery(
    op: &str,
    cycle_id: &CycleId,
    adapter: &str,
    status: &DeliveryStatus,
    started: Instant,
) {
    let duration_ms = started.elapsed().as_millis() as u64;
    match status {
        DeliveryStatus::Delivered => log_op_end!(
            op,
            duration_ms = duration_ms,
            cycle_id = %cycle_id,
            adapter = adapter
        ),
        DeliveryStatus::Failed(err) => log_op_error!(
            op,
            err.clone(),
            duration_ms = duration_ms,
            cycle_id = %cycle_id,
            adapter = adapter
        ),
        DeliveryStatus::TimedOut => log_op_error!(
            op,
            VgError::new(VgErrorKind::Timeout)
                .with_op(op)
                .with_adapter(adapter)
                .with_message("delivery did not finish in time"),
            duration_ms = duration_ms,
            cycle_id = %cycle_id,
            adapter = adapter
        ),
        DeliveryStatus::Suppressed | DeliveryStatus::NotConnected => {}
    }
}
