//! Change-set computation engine.
//!
//! The entry point is [`compute_change_set`]. It is pure: no I/O, no clock,
//! no logging.

use std::collections::{HashMap, HashSet};

use crate::diff::model::{ChangeSet, InstanceChange, StatusChange};
use crate::errors::VgError;
use crate::model::{Facility, Snapshot};

const OP: &str = "compute_change_set";

/// Compare `current` against an optional `previous` snapshot.
///
/// With no previous snapshot the result is a baseline: every current
/// facility is listed as added and nothing counts as a change.
///
/// # Errors
///
/// - `InvalidSnapshot` when either snapshot holds duplicate facility ids or
///   duplicate instance ids within a facility
pub fn compute_change_set(
    previous: Option<&Snapshot>,
    current: &Snapshot,
) -> Result<ChangeSet, VgError> {
    check_identity(current)?;
    if let Some(previous) = previous {
        check_identity(previous)?;
    }

    let dns_issues_active = current.dns_issues().map(str::to_string).collect();

    let Some(previous) = previous else {
        return Ok(ChangeSet {
            baseline: true,
            added: current.facilities().to_vec(),
            dns_issues_active,
            ..ChangeSet::default()
        });
    };

    let previous_by_id: HashMap<&str, &Facility> = previous
        .facilities()
        .iter()
        .map(|f| (f.id.as_str(), f))
        .collect();
    let current_ids: HashSet<&str> = current.facilities().iter().map(|f| f.id.as_str()).collect();

    let mut change_set = ChangeSet {
        dns_issues_active,
        ..ChangeSet::default()
    };

    for facility in current.facilities() {
        match previous_by_id.get(facility.id.as_str()) {
            None => change_set.added.push(facility.clone()),
            Some(old) => {
                if old.status != facility.status {
                    change_set.status_changed.push(StatusChange {
                        facility_id: facility.id.clone(),
                        old_status: old.status,
                        new_status: facility.status,
                    });
                }
                diff_instances(old, facility, &mut change_set.instance_changed);
            }
        }
    }

    for facility in previous.facilities() {
        if current_ids.contains(facility.id.as_str()) {
            continue;
        }
        change_set.removed.push(facility.id.clone());
        if facility.hidden {
            change_set.removed_hidden.push(facility.id.clone());
        }
    }

    Ok(change_set)
}

/// Current-order additions and status changes, then previous-order removals.
fn diff_instances(old: &Facility, new: &Facility, out: &mut Vec<InstanceChange>) {
    let old_by_id: HashMap<&str, _> = old.instances.iter().map(|i| (i.id.as_str(), i)).collect();

    for instance in &new.instances {
        match old_by_id.get(instance.id.as_str()) {
            None => out.push(InstanceChange {
                facility_id: new.id.clone(),
                instance_id: instance.id.clone(),
                old_status: None,
                new_status: Some(instance.status),
            }),
            Some(prev) if prev.status != instance.status => out.push(InstanceChange {
                facility_id: new.id.clone(),
                instance_id: instance.id.clone(),
                old_status: Some(prev.status),
                new_status: Some(instance.status),
            }),
            Some(_) => {}
        }
    }

    for prev in &old.instances {
        if new.instance(&prev.id).is_none() {
            out.push(InstanceChange {
                facility_id: new.id.clone(),
                instance_id: prev.id.clone(),
                old_status: Some(prev.status),
                new_status: None,
            });
        }
    }
}

fn check_identity(snapshot: &Snapshot) -> Result<(), VgError> {
    snapshot
        .validate_identity()
        .map_err(|e| VgError::from(e).with_op(OP))
}
