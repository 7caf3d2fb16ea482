//! Snapshot document format, version 1
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "ts": 1700000000,
//!   "refresh_interval": 900,
//!   "facilities": [
//!     { "name": "web", "desc": "Website", "hidden": 0, "status": 1 },
//!     { "name": "db", "instances": [ { "id": "db1", "port": 5432, "status": 0 } ] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use vigil_core::errors::SnapshotError;
use vigil_core::model::{summarize_status, FacilityStatus, DEFAULT_REFRESH_INTERVAL_SECS};

/// The only format version this build reads
pub const SUPPORTED_FORMAT_VERSION: u64 = 1;

/// Status code: unknown
pub const CODE_UNKNOWN: i64 = -1;
/// Status code: not working
pub const CODE_FAIL: i64 = 0;
/// Status code: working
pub const CODE_GOOD: i64 = 1;
/// Status code: partially working
pub const CODE_INCOMPLETE: i64 = 2;
/// Status code: DNS misconfigured or compromised
pub const CODE_DNS_BAD: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct DocumentV1 {
    #[serde(default)]
    pub ts: i64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    pub facilities: Vec<FacilityV1>,
}

#[derive(Debug, Deserialize)]
pub struct FacilityV1 {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub hidden: Option<Flag>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub instances: Option<Vec<InstanceV1>>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub expected_ip: Option<String>,
    #[serde(default)]
    pub dns_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceV1 {
    pub id: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_status_code")]
    pub status: i64,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Producers write flags as either booleans or 0/1 integers
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub fn is_set(flag: Option<Flag>) -> bool {
        match flag {
            Some(Flag::Bool(b)) => b,
            Some(Flag::Int(i)) => i != 0,
            None => false,
        }
    }
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_status_code() -> i64 {
    CODE_UNKNOWN
}

/// Map a status code to a status and a DNS-issue flag
pub fn status_from_code(code: i64, context: &str) -> Result<(FacilityStatus, bool), SnapshotError> {
    match code {
        CODE_UNKNOWN => Ok((FacilityStatus::Unknown, false)),
        CODE_FAIL => Ok((FacilityStatus::Down, false)),
        CODE_GOOD => Ok((FacilityStatus::Up, false)),
        CODE_INCOMPLETE => Ok((FacilityStatus::Degraded, false)),
        CODE_DNS_BAD => Ok((FacilityStatus::Degraded, true)),
        other => Err(SnapshotError::InvalidStatusCode {
            code: other,
            context: context.to_string(),
        }),
    }
}

/// Facility status when the producer left it to be derived from instances.
///
/// Returns the status and whether any instance reported a DNS failure.
pub fn derive_from_instances(instances: &[(FacilityStatus, bool)]) -> (FacilityStatus, bool) {
    let dns = instances.iter().any(|(_, dns)| *dns);
    (summarize_status(instances.iter().map(|(s, _)| *s)), dns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(status_from_code(-1, "x").unwrap(), (FacilityStatus::Unknown, false));
        assert_eq!(status_from_code(0, "x").unwrap(), (FacilityStatus::Down, false));
        assert_eq!(status_from_code(1, "x").unwrap(), (FacilityStatus::Up, false));
        assert_eq!(status_from_code(2, "x").unwrap(), (FacilityStatus::Degraded, false));
        assert_eq!(status_from_code(3, "x").unwrap(), (FacilityStatus::Degraded, true));
        assert!(matches!(
            status_from_code(7, "facility 'web'"),
            Err(SnapshotError::InvalidStatusCode { code: 7, .. })
        ));
    }

    #[test]
    fn test_derive_from_instances() {
        use FacilityStatus::*;
        assert_eq!(derive_from_instances(&[(Down, false), (Down, false)]), (Down, false));
        assert_eq!(derive_from_instances(&[(Up, false), (Down, false)]), (Degraded, false));
        assert_eq!(derive_from_instances(&[(Up, false), (Degraded, true)]), (Degraded, true));
        assert_eq!(derive_from_instances(&[(Up, false), (Up, false)]), (Up, false));
    }

    #[test]
    fn test_flag_accepts_bool_and_int() {
        let f: FacilityV1 = serde_json::from_str(r#"{"name":"a","hidden":1}"#).unwrap();
        assert!(Flag::is_set(f.hidden));
        let f: FacilityV1 = serde_json::from_str(r#"{"name":"a","hidden":false}"#).unwrap();
        assert!(!Flag::is_set(f.hidden));
        let f: FacilityV1 = serde_json::from_str(r#"{"name":"a"}"#).unwrap();
        assert!(!Flag::is_set(f.hidden));
    }
}
