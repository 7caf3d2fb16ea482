use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::status::{summarize_status, FacilityStatus};
use crate::errors::SnapshotError;

/// Refresh interval assumed when the producer does not publish one
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 900;

const MAX_REFRESH_INTERVAL_SECS: u64 = 10 * 365 * 24 * 3600;

/// One host, port or service endpoint behind a facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub id: String,
    pub status: FacilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Instance {
    pub fn new(id: impl Into<String>, status: FacilityStatus) -> Self {
        Self {
            id: id.into(),
            status,
            detail: None,
            port: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// A monitored facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facility {
    pub id: String,
    pub display_name: String,
    pub status: FacilityStatus,
    pub instances: Vec<Instance>,
    pub dns_issue: bool,
    pub hidden: bool,
}

impl Facility {
    pub fn new(id: impl Into<String>, status: FacilityStatus) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            status,
            instances: Vec::new(),
            dns_issue: false,
            hidden: false,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_dns_issue(mut self, dns_issue: bool) -> Self {
        self.dns_issue = dns_issue;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn instance(&self, instance_id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == instance_id)
    }
}

/// Immutable, timestamped read of every facility's status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    generated_at: DateTime<Utc>,
    refresh_interval_secs: u64,
    facilities: Vec<Facility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

impl Snapshot {
    /// Build a snapshot. Identity rules are checked by [`Snapshot::validate`].
    pub fn new(generated_at: DateTime<Utc>, facilities: Vec<Facility>) -> Self {
        Self {
            generated_at,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            facilities,
            digest: None,
        }
    }

    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Attach the content digest of the bytes this snapshot was parsed from
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn refresh_interval_secs(&self) -> u64 {
        self.refresh_interval_secs
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn facility(&self, facility_id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == facility_id)
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// When the producer is expected to publish the next snapshot
    pub fn next_refresh(&self) -> DateTime<Utc> {
        let secs = self.refresh_interval_secs.min(MAX_REFRESH_INTERVAL_SECS) as i64;
        self.generated_at
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(self.generated_at)
    }

    /// True once the expected next refresh time has been reached
    pub fn is_outdated(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_refresh()
    }

    /// Summary status over the facilities a reader can see.
    ///
    /// Hidden facilities are only counted when `include_hidden` is set.
    pub fn overall_status(&self, include_hidden: bool) -> FacilityStatus {
        summarize_status(
            self.facilities
                .iter()
                .filter(|f| include_hidden || !f.hidden)
                .map(|f| f.status),
        )
    }

    /// Ids of facilities flagged with an active DNS issue, in snapshot order
    pub fn dns_issues(&self) -> impl Iterator<Item = &str> {
        self.facilities
            .iter()
            .filter(|f| f.dns_issue)
            .map(|f| f.id.as_str())
    }

    /// Full document rules: at least one facility, plus [`Snapshot::validate_identity`].
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.facilities.is_empty() {
            return Err(SnapshotError::NoFacilities);
        }
        self.validate_identity()
    }

    /// Identity rules: non-empty and unique facility ids, non-empty and
    /// unique instance ids within each facility.
    pub fn validate_identity(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();
        for facility in &self.facilities {
            if facility.id.trim().is_empty() {
                return Err(SnapshotError::EmptyId {
                    context: "facility".to_string(),
                });
            }
            if !seen.insert(facility.id.as_str()) {
                return Err(SnapshotError::DuplicateFacility {
                    facility_id: facility.id.clone(),
                });
            }

            let mut seen_instances = HashSet::new();
            for instance in &facility.instances {
                if instance.id.trim().is_empty() {
                    return Err(SnapshotError::EmptyId {
                        context: format!("instance of facility '{}'", facility.id),
                    });
                }
                if !seen_instances.insert(instance.id.as_str()) {
                    return Err(SnapshotError::DuplicateInstance {
                        facility_id: facility.id.clone(),
                        instance_id: instance.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
