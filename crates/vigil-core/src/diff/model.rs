//! Change-set types.

use serde::Serialize;

use crate::model::{Facility, FacilityStatus};

/// Everything that differs between a previous and a current snapshot.
///
/// A change set built against no previous snapshot is a *baseline*: every
/// facility is listed in `added`, but [`ChangeSet::has_any_change`] is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// True when there was no previous snapshot to compare against
    pub baseline: bool,
    /// Facilities present only in the current snapshot, in current order
    pub added: Vec<Facility>,
    /// Ids of facilities present only in the previous snapshot, in previous order
    pub removed: Vec<String>,
    /// The subset of `removed` that was hidden in the previous snapshot
    pub removed_hidden: Vec<String>,
    /// Facilities present in both whose own status differs
    pub status_changed: Vec<StatusChange>,
    /// Instance additions, removals and status changes
    pub instance_changed: Vec<InstanceChange>,
    /// Ids of facilities in the current snapshot with an active DNS issue
    pub dns_issues_active: Vec<String>,
}

impl ChangeSet {
    /// True iff anything was added, removed or changed.
    ///
    /// DNS issues on their own are state, not change.
    pub fn has_any_change(&self) -> bool {
        !self.baseline
            && (!self.added.is_empty()
                || !self.removed.is_empty()
                || !self.status_changed.is_empty()
                || !self.instance_changed.is_empty())
    }

    pub fn change_count(&self) -> usize {
        if self.baseline {
            return 0;
        }
        self.added.len()
            + self.removed.len()
            + self.status_changed.len()
            + self.instance_changed.len()
    }

    pub fn status_change_for(&self, facility_id: &str) -> Option<&StatusChange> {
        self.status_changed
            .iter()
            .find(|c| c.facility_id == facility_id)
    }

    pub fn instance_change_for(
        &self,
        facility_id: &str,
        instance_id: &str,
    ) -> Option<&InstanceChange> {
        self.instance_changed
            .iter()
            .find(|c| c.facility_id == facility_id && c.instance_id == instance_id)
    }

    pub fn is_added(&self, facility_id: &str) -> bool {
        !self.baseline && self.added.iter().any(|f| f.id == facility_id)
    }

    /// True when the facility itself or any of its instances changed
    pub fn touches_facility(&self, facility_id: &str) -> bool {
        self.is_added(facility_id)
            || self.status_change_for(facility_id).is_some()
            || self
                .instance_changed
                .iter()
                .any(|c| c.facility_id == facility_id)
    }
}

/// A facility whose own status moved between snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub facility_id: String,
    pub old_status: FacilityStatus,
    pub new_status: FacilityStatus,
}

/// What happened to an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceChangeKind {
    Added,
    Removed,
    StatusChanged,
}

/// One instance-level change within a facility present in both snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceChange {
    pub facility_id: String,
    pub instance_id: String,
    /// Absent when the instance was added
    pub old_status: Option<FacilityStatus>,
    /// Absent when the instance was removed
    pub new_status: Option<FacilityStatus>,
}

impl InstanceChange {
    pub fn kind(&self) -> InstanceChangeKind {
        match (self.old_status, self.new_status) {
            (None, _) => InstanceChangeKind::Added,
            (_, None) => InstanceChangeKind::Removed,
            _ => InstanceChangeKind::StatusChanged,
        }
    }
}
