//! Structured report built from a render decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{ChangeSet, InstanceChangeKind};
use crate::model::{Facility, FacilityStatus, Snapshot};
use crate::policy::RenderDecision;

pub const DEFAULT_TITLE: &str = "Site Status";
pub const DEFAULT_DNS_NOTICE: &str =
    "WARNING: one or more facilities or instances report DNS issues.";
pub const DEFAULT_LOAD_ERROR_NOTICE: &str =
    "An error occurred while reading the status report. Check the logs for details.";

/// Presentation settings shared by every adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub title: String,
    pub site_url: String,
    pub dns_notice: String,
    pub include_hidden: bool,
    /// Sent in place of a report when the status document cannot be loaded
    pub load_error_notice: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            site_url: String::new(),
            dns_notice: DEFAULT_DNS_NOTICE.to_string(),
            include_hidden: false,
            load_error_notice: DEFAULT_LOAD_ERROR_NOTICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    Full,
    ChangesOnly,
}

/// How an entry relates to the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryChange {
    Unchanged,
    Added,
    Removed,
    StatusChanged,
}

/// One facility or `facility/instance` line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub label: String,
    pub facility_id: String,
    pub instance_id: Option<String>,
    /// Current status; for removals, the last known status
    pub status: FacilityStatus,
    pub previous: Option<FacilityStatus>,
    pub change: EntryChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    pub scope: ReportScope,
    pub title: String,
    pub overall: FacilityStatus,
    pub generated_at: DateTime<Utc>,
    /// Set to the missed refresh time when the snapshot is outdated
    pub stale_since: Option<DateTime<Utc>>,
    pub dns_notice: Option<String>,
    pub entries: Vec<ReportEntry>,
    /// Hidden facilities left out of `entries` that are not up
    pub hidden_impacted: usize,
    pub site_url: Option<String>,
}

/// Build the report for `decision`, or `None` when the decision is to suppress.
pub fn build_report_view(
    decision: RenderDecision,
    change_set: &ChangeSet,
    snapshot: &Snapshot,
    options: &RenderOptions,
    now: DateTime<Utc>,
) -> Option<ReportView> {
    let (scope, collected) = match decision {
        RenderDecision::Suppress => return None,
        RenderDecision::RenderFull => (ReportScope::Full, full_entries(change_set, snapshot, options)),
        RenderDecision::RenderChangesOnly => (
            ReportScope::ChangesOnly,
            change_entries(change_set, snapshot, options),
        ),
    };

    let dns_notice = (!change_set.dns_issues_active.is_empty() && !options.dns_notice.is_empty())
        .then(|| options.dns_notice.clone());

    Some(ReportView {
        scope,
        title: options.title.clone(),
        overall: snapshot.overall_status(options.include_hidden),
        generated_at: snapshot.generated_at(),
        stale_since: snapshot
            .is_outdated(now)
            .then(|| snapshot.next_refresh()),
        dns_notice,
        entries: collected.entries,
        hidden_impacted: collected.hidden_impacted,
        site_url: (!options.site_url.is_empty()).then(|| options.site_url.clone()),
    })
}

#[derive(Default)]
struct Collected {
    entries: Vec<ReportEntry>,
    hidden_impacted: usize,
}

impl Collected {
    /// Returns false when the facility is hidden from readers
    fn admit(&mut self, facility: &Facility, options: &RenderOptions) -> bool {
        if facility.hidden && !options.include_hidden {
            if !facility.status.is_up() {
                self.hidden_impacted += 1;
            }
            return false;
        }
        true
    }
}

fn facility_entry(facility: &Facility, change_set: &ChangeSet) -> ReportEntry {
    let status_change = change_set.status_change_for(&facility.id);
    let change = if change_set.is_added(&facility.id) {
        EntryChange::Added
    } else if status_change.is_some() {
        EntryChange::StatusChanged
    } else {
        EntryChange::Unchanged
    };
    ReportEntry {
        label: facility.display_name.clone(),
        facility_id: facility.id.clone(),
        instance_id: None,
        status: facility.status,
        previous: status_change.map(|c| c.old_status),
        change,
    }
}

fn removed_entries(change_set: &ChangeSet, options: &RenderOptions, out: &mut Vec<ReportEntry>) {
    for id in &change_set.removed {
        if !options.include_hidden && change_set.removed_hidden.contains(id) {
            continue;
        }
        out.push(ReportEntry {
            label: id.clone(),
            facility_id: id.clone(),
            instance_id: None,
            status: FacilityStatus::Unknown,
            previous: None,
            change: EntryChange::Removed,
        });
    }
}

fn full_entries(change_set: &ChangeSet, snapshot: &Snapshot, options: &RenderOptions) -> Collected {
    let mut collected = Collected::default();

    for facility in snapshot.facilities() {
        if !collected.admit(facility, options) {
            continue;
        }

        let impaired: Vec<_> = facility
            .instances
            .iter()
            .filter(|i| !i.status.is_up())
            .collect();

        if facility.status.is_up() || impaired.is_empty() {
            collected.entries.push(facility_entry(facility, change_set));
            continue;
        }

        for instance in impaired {
            let instance_change = change_set.instance_change_for(&facility.id, &instance.id);
            let change = match instance_change.map(|c| c.kind()) {
                Some(InstanceChangeKind::Added) => EntryChange::Added,
                Some(_) => EntryChange::StatusChanged,
                None if change_set.is_added(&facility.id) => EntryChange::Added,
                None => EntryChange::Unchanged,
            };
            collected.entries.push(ReportEntry {
                label: format!("{}/{}", facility.display_name, instance.id),
                facility_id: facility.id.clone(),
                instance_id: Some(instance.id.clone()),
                status: instance.status,
                previous: instance_change.and_then(|c| c.old_status),
                change,
            });
        }
    }

    removed_entries(change_set, options, &mut collected.entries);
    collected
}

fn change_entries(
    change_set: &ChangeSet,
    snapshot: &Snapshot,
    options: &RenderOptions,
) -> Collected {
    let mut collected = Collected::default();

    for facility in snapshot.facilities() {
        if !change_set.touches_facility(&facility.id) || !collected.admit(facility, options) {
            continue;
        }

        if change_set.is_added(&facility.id) || change_set.status_change_for(&facility.id).is_some()
        {
            collected.entries.push(facility_entry(facility, change_set));
        }

        for change in change_set
            .instance_changed
            .iter()
            .filter(|c| c.facility_id == facility.id)
        {
            let (status, entry_change) = match (change.kind(), change.old_status, change.new_status) {
                (InstanceChangeKind::Removed, Some(old), _) => (old, EntryChange::Removed),
                (InstanceChangeKind::Added, _, Some(new)) => (new, EntryChange::Added),
                (_, _, Some(new)) => (new, EntryChange::StatusChanged),
                _ => (FacilityStatus::Unknown, EntryChange::StatusChanged),
            };
            collected.entries.push(ReportEntry {
                label: format!("{}/{}", facility.display_name, change.instance_id),
                facility_id: facility.id.clone(),
                instance_id: Some(change.instance_id.clone()),
                status,
                previous: match entry_change {
                    EntryChange::StatusChanged => change.old_status,
                    _ => None,
                },
                change: entry_change,
            });
        }
    }

    removed_entries(change_set, options, &mut collected.entries);
    collected
}
