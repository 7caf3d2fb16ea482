#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{document, write_document};
use serde_json::json;
use tempfile::TempDir;
use vigil_core::errors::VgErrorKind;
use vigil_core::FacilityStatus;
use vigil_store::snapshot::{content_digest, load_snapshot_file, parse_snapshot_bytes};
use vigil_store::SnapshotStore;

#[tokio::test]
async fn test_load_full_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(
        dir.path(),
        "report.json",
        &document(json!([
            {"name": "web", "desc": "Website", "status": 1},
            {"name": "forums", "hidden": 1, "status": 0},
            {"name": "db", "instances": [
                {"id": "db1", "port": 5432, "status": 1},
                {"id": "db2", "port": 5433, "status": 3, "detail": "resolves to wrong host"}
            ]}
        ])),
    );

    let snapshot = SnapshotStore::new(&path).load().await.unwrap();
    let facilities = snapshot.facilities();

    assert_eq!(facilities.len(), 3);
    assert_eq!(facilities[0].display_name, "Website");
    assert!(facilities[1].hidden);
    assert_eq!(facilities[2].status, FacilityStatus::Degraded);
    assert!(facilities[2].dns_issue);
    assert_eq!(facilities[2].instances[1].port, Some(5433));
    assert_eq!(
        facilities[2].instances[1].detail.as_deref(),
        Some("resolves to wrong host")
    );
    assert_eq!(snapshot.refresh_interval_secs(), 600);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(snapshot.digest(), Some(content_digest(&bytes).as_str()));
}

#[tokio::test]
async fn test_missing_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    let err = SnapshotStore::new(dir.path().join("absent.json"))
        .load()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), VgErrorKind::SnapshotLoad);
    assert!(err.path().unwrap().ends_with("absent.json"));
}

#[test]
fn test_duplicate_facility_is_invalid_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_document(
        dir.path(),
        "report.json",
        &document(json!([
            {"name": "web", "status": 1},
            {"name": "web", "status": 0}
        ])),
    );

    let err = load_snapshot_file(&path).unwrap_err();
    assert_eq!(err.kind(), VgErrorKind::InvalidSnapshot);
    assert_eq!(err.facility_id(), Some("web"));
}

#[test]
fn test_unsupported_format_version() {
    let doc = json!({"format_version": 2, "facilities": [{"name": "web", "status": 1}]});
    let err = parse_snapshot_bytes(&serde_json::to_vec(&doc).unwrap()).unwrap_err();
    let err: vigil_core::VgError = err.into();
    assert_eq!(err.kind(), VgErrorKind::UnsupportedFormat);
}

#[test]
fn test_empty_facility_list_is_invalid() {
    let err = parse_snapshot_bytes(br#"{"facilities": []}"#).unwrap_err();
    let err: vigil_core::VgError = err.into();
    assert_eq!(err.kind(), VgErrorKind::InvalidSnapshot);
}

#[test]
fn test_unknown_status_code_is_load_error() {
    let err = parse_snapshot_bytes(br#"{"facilities": [{"name": "web", "status": 9}]}"#)
        .unwrap_err();
    let err: vigil_core::VgError = err.into();
    assert_eq!(err.kind(), VgErrorKind::SnapshotLoad);
    assert!(err.message().contains("facility 'web'"));
}

#[test]
fn test_truncated_json_is_load_error() {
    let err = parse_snapshot_bytes(br#"{"facilities": [{"name": "#).unwrap_err();
    let err: vigil_core::VgError = err.into();
    assert_eq!(err.kind(), VgErrorKind::SnapshotLoad);
}

#[test]
fn test_derived_status_all_instances_down() {
    let doc = document(json!([
        {"name": "irc", "instances": [
            {"id": "a", "status": 0},
            {"id": "b", "status": 0}
        ]}
    ]));
    let snapshot = parse_snapshot_bytes(&serde_json::to_vec(&doc).unwrap()).unwrap();
    assert_eq!(snapshot.facilities()[0].status, FacilityStatus::Down);
}
