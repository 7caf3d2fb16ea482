//! In-memory log capture for tests
//!
//! Records every event emitted while the capture subscriber is installed so
//! tests can follow one pipeline pass (by `cycle_id`) or one adapter through
//! the structured log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::vigil_core_types::schema::{
    FIELD_ADAPTER, FIELD_CYCLE_ID, FIELD_ERR_CODE, FIELD_EVENT, FIELD_OP,
};

/// One captured log event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub cycle_id: Option<String>,
    pub adapter: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Stable error code, on `end_error` events
    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    // Numbers, bools and `%`/`?` values all arrive here.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let Fields(fields) = fields;

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: fields.get(FIELD_OP).cloned(),
            event: fields.get(FIELD_EVENT).cloned(),
            cycle_id: fields.get(FIELD_CYCLE_ID).cloned(),
            adapter: fields.get(FIELD_ADAPTER).cloned(),
            fields,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Handle for reading captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Everything logged under one pipeline pass, in emission order
    pub fn events_for_cycle(&self, cycle_id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.cycle_id.as_deref() == Some(cycle_id))
            .collect()
    }

    /// Everything logged about one adapter, in emission order
    pub fn events_for_adapter(&self, adapter: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.adapter.as_deref() == Some(adapter))
            .collect()
    }

    /// `(op, event)` pairs logged under one pipeline pass
    pub fn ops_for_cycle(&self, cycle_id: &str) -> Vec<(String, String)> {
        self.events_for_cycle(cycle_id)
            .into_iter()
            .filter_map(|e| Some((e.op?, e.event?)))
            .collect()
    }

    /// # Panics
    ///
    /// Panics if no event has the given `op` and `event`
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "no {op}/{event} event among {} captured",
            events.len()
        );
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture subscriber once per test binary and return its handle.
///
/// Tests in one binary share the capture, so filter on something unique to
/// the test: an op name, a cycle id or an adapter name.
///
/// # Example
///
/// ```
/// use vigil_core::logging_facility::test_capture::init_test_capture;
/// use vigil_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_example_op", cycle_id = "c-doc");
/// assert_eq!(capture.ops_for_cycle("c-doc")[0].0, "doc_example_op");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Arc::new(Mutex::new(Vec::new()));
            let layer = CaptureLayer {
                events: Arc::clone(&events),
            };
            tracing_subscriber::registry().with(layer).init();
            TestCapture { events }
        })
        .clone()
}
