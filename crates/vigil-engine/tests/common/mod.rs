use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;
use vigil_core::{NotificationMode, RenderDecision};
use vigil_engine::{
    AdapterError, AdapterState, Alert, Backoff, ChannelAdapter, CommandDispatch, Delivery, Orchestrator,
    OrchestratorSettings, Registration,
};
use vigil_core_types::CycleId;

/// Status document with the given generation time and `(name, status)` facilities
#[allow(dead_code)]
pub fn document(ts: i64, facilities: &[(&str, i64)]) -> Value {
    let facilities: Vec<Value> = facilities
        .iter()
        .map(|(name, status)| json!({"name": name, "status": status}))
        .collect();
    json!({
        "format_version": 1,
        "ts": ts,
        "refresh_interval": 600,
        "facilities": facilities,
    })
}

#[allow(dead_code)]
pub fn write_document(path: &Path, doc: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
}

#[allow(dead_code)]
pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join("report.json")
}

#[allow(dead_code)]
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        delivery_timeout: Duration::from_secs(2),
        shutdown_grace: Duration::from_secs(2),
        command_timeout: Duration::from_secs(2),
        backoff: Backoff::new(Duration::from_millis(5), Duration::from_millis(20)),
        ..OrchestratorSettings::default()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub cycle_id: CycleId,
    pub decision: RenderDecision,
    pub lines: Vec<String>,
}

/// In-memory adapter that records every delivery it is asked to make
pub struct RecordingAdapter {
    name: String,
    deliveries: Mutex<Vec<RecordedDelivery>>,
    alerts: Mutex<Vec<String>>,
    connects: AtomicUsize,
    failing_connects: AtomicUsize,
    failing_deliveries: AtomicUsize,
    never_connect: bool,
    deliver_delay: Option<Duration>,
    hang_on_disconnect: bool,
    lose_session: Notify,
}

#[allow(dead_code)]
impl RecordingAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            deliveries: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            failing_connects: AtomicUsize::new(0),
            failing_deliveries: AtomicUsize::new(0),
            never_connect: false,
            deliver_delay: None,
            hang_on_disconnect: false,
            lose_session: Notify::new(),
        }
    }

    /// Fail the first `count` connection attempts
    pub fn failing_connects(self, count: usize) -> Self {
        self.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    pub fn never_connecting(mut self) -> Self {
        self.never_connect = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.deliver_delay = Some(delay);
        self
    }

    pub fn failing_deliveries(self) -> Self {
        self.failing_next_deliveries(usize::MAX)
    }

    /// Reject the next `count` reports
    pub fn failing_next_deliveries(self, count: usize) -> Self {
        self.failing_deliveries.store(count, Ordering::SeqCst);
        self
    }

    /// `disconnect` never returns
    pub fn hanging_disconnect(mut self) -> Self {
        self.hang_on_disconnect = true;
        self
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Alert texts received, in order
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// End the current session as if the transport dropped
    pub fn drop_session(&self) {
        self.lose_session.notify_one();
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        if self.never_connect {
            return Err(AdapterError::Connect {
                reason: "unreachable".to_string(),
            });
        }
        let remaining = self.failing_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(AdapterError::Connect {
                reason: "refused".to_string(),
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn serve(&self, _commands: CommandDispatch) -> Result<(), AdapterError> {
        self.lose_session.notified().await;
        Err(AdapterError::TransportLost {
            reason: "dropped by test".to_string(),
        })
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), AdapterError> {
        if let Some(delay) = self.deliver_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failing_deliveries.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failing_deliveries.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(AdapterError::Delivery {
                destination: "nowhere".to_string(),
                reason: "rejected".to_string(),
            });
        }
        self.deliveries.lock().unwrap().push(RecordedDelivery {
            cycle_id: delivery.cycle_id.clone(),
            decision: delivery.decision,
            lines: delivery.plain_lines(),
        });
        Ok(())
    }

    async fn deliver_alert(&self, alert: &Alert) -> Result<(), AdapterError> {
        self.alerts.lock().unwrap().push(alert.text.clone());
        Ok(())
    }

    async fn disconnect(&self) {
        if self.hang_on_disconnect {
            std::future::pending::<()>().await;
        }
    }
}

#[allow(dead_code)]
pub fn register(adapter: &Arc<RecordingAdapter>, mode: NotificationMode) -> Registration {
    Registration::new(
        Arc::clone(adapter) as Arc<dyn ChannelAdapter>,
        mode,
        vec!["#status".to_string()],
    )
}

/// Poll `condition` every few milliseconds for up to five seconds
#[allow(dead_code)]
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[allow(dead_code)]
pub async fn wait_connected(orchestrator: &Orchestrator, names: &[&str]) {
    let connected = eventually(|| {
        names
            .iter()
            .all(|n| orchestrator.adapter_state(n) == Some(AdapterState::Connected))
    })
    .await;
    assert!(connected, "adapters {:?} never connected", names);
}
