//! Structured log output of the pipeline and the command gate

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{document, fast_settings, register, snapshot_path, write_document, RecordingAdapter};
use tempfile::TempDir;
use tokio::sync::mpsc;
use vigil_core::logging_facility::test_capture::init_test_capture;
use vigil_core::NotificationMode;
use vigil_engine::{CommandDispatch, CommandGate, CycleOutcome, Orchestrator, SenderIdentity};
use vigil_store::config::DenyReply;
use vigil_store::SnapshotStore;

fn pair(op: &str, event: &str) -> (String, String) {
    (op.to_string(), event.to_string())
}

#[tokio::test]
async fn test_cycle_log_lines_carry_the_cycle_id() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let path = snapshot_path(dir.path());
    write_document(&path, &document(1_000, &[("web", 1)]));
    let adapter = Arc::new(RecordingAdapter::new("logged"));
    let mut orch = Orchestrator::initialize(
        SnapshotStore::new(&path),
        fast_settings(),
        vec![register(&adapter, NotificationMode::Always)],
    )
    .await
    .unwrap();
    orch.start_adapters();
    common::wait_connected(&orch, &["logged"]).await;

    write_document(&path, &document(2_000, &[("web", 0)]));
    let cycle_id = match orch.run_cycle().await {
        CycleOutcome::Committed { cycle_id, .. } => cycle_id,
        other => panic!("expected a committed cycle, got {:?}", other),
    };

    let ops = capture.ops_for_cycle(cycle_id.as_str());
    assert_eq!(ops.first(), Some(&pair("pipeline_cycle", "start")));
    assert_eq!(ops.last(), Some(&pair("pipeline_cycle", "end")));
    assert!(ops.contains(&pair("deliver", "end")));

    let delivered = capture
        .events_for_cycle(cycle_id.as_str())
        .into_iter()
        .find(|e| e.op.as_deref() == Some("deliver"))
        .unwrap();
    assert_eq!(delivered.adapter.as_deref(), Some("logged"));

    orch.shutdown().await;
}

#[tokio::test]
async fn test_failed_load_is_logged_with_its_code() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let path = snapshot_path(dir.path());
    write_document(&path, &document(1_000, &[("web", 1)]));
    let adapter = Arc::new(RecordingAdapter::new("quiet"));
    let mut orch = Orchestrator::initialize(
        SnapshotStore::new(&path),
        fast_settings(),
        vec![register(&adapter, NotificationMode::ChangesOnlyStrict)],
    )
    .await
    .unwrap();

    std::fs::write(&path, b"{ not json").unwrap();
    let cycle_id = match orch.run_cycle().await {
        CycleOutcome::Skipped { cycle_id, .. } => cycle_id,
        other => panic!("expected a skipped cycle, got {:?}", other),
    };

    let failed = capture
        .events_for_cycle(cycle_id.as_str())
        .into_iter()
        .find(|e| e.event.as_deref() == Some("end_error"))
        .unwrap();
    assert_eq!(failed.op.as_deref(), Some("pipeline_cycle"));
    assert_eq!(failed.err_code(), Some("ERR_SNAPSHOT_LOAD"));
}

#[tokio::test]
async fn test_denied_command_is_logged_as_unauthorised() {
    let capture = init_test_capture();
    let (tx, _rx) = mpsc::channel(1);
    let dispatch = CommandDispatch::new(tx, Duration::from_secs(1));
    let gate = CommandGate::new(&["alice".to_string()], DenyReply::Silent);

    let reply = dispatch
        .handle_inbound_command("gatekeeper", &gate, &SenderIdentity::new("eve", None), "report")
        .await;
    assert_eq!(reply, None);

    let denied: Vec<_> = capture
        .events_for_adapter("gatekeeper")
        .into_iter()
        .filter(|e| e.err_code() == Some("ERR_UNAUTHORISED"))
        .collect();
    assert_eq!(denied.len(), 1);
    assert!(denied[0].field("error").unwrap().contains("'eve'"));
}
