//! Snapshot loading and conversion into the domain model.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use vigil_core::errors::{SnapshotError, VgError};
use vigil_core::model::{Facility, Instance, Snapshot};
use vigil_core::{log_op_end, log_op_error, log_op_start};

use super::digest::content_digest;
use super::format_v1::{
    derive_from_instances, status_from_code, DocumentV1, FacilityV1, Flag, SUPPORTED_FORMAT_VERSION,
};
use crate::errors::{snapshot_read_error, Result};

const OP_LOAD: &str = "load_snapshot";

/// Re-readable handle on the snapshot document at a fixed location
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and validate the document.
    ///
    /// # Errors
    ///
    /// - `SnapshotLoad`: unreadable file, malformed JSON, unknown status code
    /// - `UnsupportedFormat`: `format_version` other than 1
    /// - `InvalidSnapshot`: no facilities, empty ids, duplicate ids
    pub async fn load(&self) -> Result<Snapshot> {
        let started = Instant::now();
        log_op_start!(OP_LOAD, path = %self.path.display());

        let result = match tokio::fs::read(&self.path).await {
            Ok(bytes) => self.parse(&bytes),
            Err(err) => Err(snapshot_read_error(&self.path, err)),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(snapshot) => log_op_end!(
                OP_LOAD,
                duration_ms = duration_ms,
                facility_count = snapshot.facilities().len() as u64
            ),
            Err(err) => log_op_error!(OP_LOAD, err.clone(), duration_ms = duration_ms),
        }
        result
    }

    fn parse(&self, bytes: &[u8]) -> Result<Snapshot> {
        parse_snapshot_bytes(bytes).map_err(|e| {
            VgError::from(e)
                .with_op(OP_LOAD)
                .with_path(self.path.display().to_string())
        })
    }
}

/// Blocking one-shot load, for command-line tooling
pub fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let bytes = std::fs::read(path).map_err(|e| snapshot_read_error(path, e))?;
    parse_snapshot_bytes(&bytes).map_err(|e| {
        VgError::from(e)
            .with_op(OP_LOAD)
            .with_path(path.display().to_string())
    })
}

/// Parse raw document bytes into a validated snapshot carrying their digest.
pub fn parse_snapshot_bytes(bytes: &[u8]) -> std::result::Result<Snapshot, SnapshotError> {
    let raw: Value = serde_json::from_slice(bytes)?;

    let obj = raw.as_object().ok_or_else(|| SnapshotError::Malformed {
        message: "document root must be an object".to_string(),
    })?;

    if let Some(version) = obj.get("format_version") {
        let version = version.as_u64().ok_or_else(|| SnapshotError::Malformed {
            message: format!("`format_version` must be an unsigned integer, got: {version}"),
        })?;
        if version != SUPPORTED_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedFormat {
                version,
                expected: SUPPORTED_FORMAT_VERSION,
            });
        }
    }

    let document: DocumentV1 = serde_json::from_value(raw)?;

    let generated_at = Utc
        .timestamp_opt(document.ts, 0)
        .single()
        .ok_or_else(|| SnapshotError::Malformed {
            message: format!("`ts` is out of range: {}", document.ts),
        })?;

    let facilities = document
        .facilities
        .into_iter()
        .map(convert_facility)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let snapshot = Snapshot::new(generated_at, facilities)
        .with_refresh_interval_secs(document.refresh_interval)
        .with_digest(content_digest(bytes));
    snapshot.validate()?;
    Ok(snapshot)
}

fn convert_facility(raw: FacilityV1) -> std::result::Result<Facility, SnapshotError> {
    let context = format!("facility '{}'", raw.name);

    let mut instances = Vec::new();
    let mut instance_states = Vec::new();
    for inst in raw.instances.unwrap_or_default() {
        let (status, dns) =
            status_from_code(inst.status, &format!("instance '{}' of {}", inst.id, context))?;
        instance_states.push((status, dns));

        let mut instance = Instance::new(inst.id, status);
        instance.detail = inst.detail;
        instance.port = inst.port;
        instances.push(instance);
    }

    let (status, mut dns_issue) = match raw.status {
        Some(code) => status_from_code(code, &context)?,
        None => derive_from_instances(&instance_states),
    };

    if let (Some(expected), Some(resolved)) = (&raw.expected_ip, &raw.dns_ip) {
        if expected != resolved {
            dns_issue = true;
        }
    }

    let display_name = raw
        .desc
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| raw.name.clone());

    let mut facility = Facility::new(raw.name, status)
        .with_display_name(display_name)
        .with_dns_issue(dns_issue)
        .with_hidden(Flag::is_set(raw.hidden));
    facility.instances = instances;
    Ok(facility)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::model::FacilityStatus;

    #[test]
    fn test_parse_minimal_document() {
        let snapshot =
            parse_snapshot_bytes(br#"{"ts": 1700000000, "facilities": [{"name": "web", "status": 1}]}"#)
                .unwrap();
        assert_eq!(snapshot.facilities().len(), 1);
        assert_eq!(snapshot.facilities()[0].status, FacilityStatus::Up);
        assert_eq!(snapshot.facilities()[0].display_name, "web");
        assert_eq!(snapshot.refresh_interval_secs(), 900);
        assert_eq!(snapshot.generated_at().timestamp(), 1_700_000_000);
        assert!(snapshot.digest().is_some());
    }

    #[test]
    fn test_facility_without_status_or_instances_is_unknown() {
        let snapshot = parse_snapshot_bytes(br#"{"facilities": [{"name": "web"}]}"#).unwrap();
        assert_eq!(snapshot.facilities()[0].status, FacilityStatus::Unknown);
    }

    #[test]
    fn test_ip_mismatch_flags_dns_issue() {
        let snapshot = parse_snapshot_bytes(
            br#"{"facilities": [{"name": "web", "status": 1, "expected_ip": "192.0.2.1", "dns_ip": "192.0.2.9"}]}"#,
        )
        .unwrap();
        assert!(snapshot.facilities()[0].dns_issue);
        assert_eq!(snapshot.facilities()[0].status, FacilityStatus::Up);
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        assert!(matches!(
            parse_snapshot_bytes(b"[1, 2]"),
            Err(SnapshotError::Malformed { .. })
        ));
    }
}
