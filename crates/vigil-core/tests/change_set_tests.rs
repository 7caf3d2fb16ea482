#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Change-set behaviour over whole snapshots.

mod common;

use common::{facility, snapshot, snapshot_strategy};
use proptest::prelude::*;
use vigil_core::diff::{compute_change_set, InstanceChangeKind, StatusChange};
use vigil_core::errors::VgErrorKind;
use vigil_core::{FacilityStatus, Instance};

#[test]
fn test_web_goes_down() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Up)]);
    let current = snapshot(vec![facility("web", FacilityStatus::Down)]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();

    assert_eq!(
        cs.status_changed,
        vec![StatusChange {
            facility_id: "web".to_string(),
            old_status: FacilityStatus::Up,
            new_status: FacilityStatus::Down,
        }]
    );
    assert!(cs.added.is_empty());
    assert!(cs.removed.is_empty());
    assert!(cs.has_any_change());
}

#[test]
fn test_added_facility_is_not_a_status_change() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Up)]);
    let current = snapshot(vec![
        facility("web", FacilityStatus::Up),
        facility("db", FacilityStatus::Down),
    ]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();

    assert_eq!(cs.added.len(), 1);
    assert_eq!(cs.added[0].id, "db");
    assert!(cs.status_changed.is_empty());
}

#[test]
fn test_removed_facilities_follow_previous_order() {
    let previous = snapshot(vec![
        facility("c", FacilityStatus::Up),
        facility("web", FacilityStatus::Up),
        facility("a", FacilityStatus::Up),
    ]);
    let current = snapshot(vec![facility("web", FacilityStatus::Up)]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();

    assert_eq!(cs.removed, vec!["c".to_string(), "a".to_string()]);
}

#[test]
fn test_status_changes_follow_current_order() {
    let previous = snapshot(vec![
        facility("a", FacilityStatus::Up),
        facility("b", FacilityStatus::Up),
    ]);
    let current = snapshot(vec![
        facility("b", FacilityStatus::Down),
        facility("a", FacilityStatus::Down),
    ]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();
    let order: Vec<_> = cs.status_changed.iter().map(|c| c.facility_id.as_str()).collect();
    assert_eq!(order, vec!["b", "a"]);
}

#[test]
fn test_instances_of_new_facilities_are_not_diffed() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Up)]);
    let current = snapshot(vec![
        facility("web", FacilityStatus::Up),
        facility("db", FacilityStatus::Up).with_instance(Instance::new("db1", FacilityStatus::Up)),
    ]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();
    assert!(cs.instance_changed.is_empty());
}

#[test]
fn test_instance_status_change_without_facility_change() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Degraded)
        .with_instance(Instance::new("a", FacilityStatus::Up))
        .with_instance(Instance::new("b", FacilityStatus::Down))]);
    let current = snapshot(vec![facility("web", FacilityStatus::Degraded)
        .with_instance(Instance::new("a", FacilityStatus::Down))
        .with_instance(Instance::new("b", FacilityStatus::Up))]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();

    assert!(cs.status_changed.is_empty());
    assert_eq!(cs.instance_changed.len(), 2);
    assert!(cs
        .instance_changed
        .iter()
        .all(|c| c.kind() == InstanceChangeKind::StatusChanged));
}

#[test]
fn test_dns_issues_reflect_current_state() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Up).with_dns_issue(true)]);
    let current = snapshot(vec![facility("web", FacilityStatus::Up).with_dns_issue(true)]);

    let cs = compute_change_set(Some(&previous), &current).unwrap();

    assert_eq!(cs.dns_issues_active, vec!["web".to_string()]);
    assert!(!cs.has_any_change());
}

#[test]
fn test_duplicate_facility_in_current_is_invalid() {
    let current = snapshot(vec![
        facility("web", FacilityStatus::Up),
        facility("web", FacilityStatus::Down),
    ]);

    let err = compute_change_set(None, &current).unwrap_err();
    assert_eq!(err.kind(), VgErrorKind::InvalidSnapshot);
    assert_eq!(err.facility_id(), Some("web"));
}

#[test]
fn test_duplicate_instance_is_invalid() {
    let previous = snapshot(vec![facility("web", FacilityStatus::Up)]);
    let current = snapshot(vec![facility("web", FacilityStatus::Up)
        .with_instance(Instance::new("a", FacilityStatus::Up))
        .with_instance(Instance::new("a", FacilityStatus::Up))]);

    let err = compute_change_set(Some(&previous), &current).unwrap_err();
    assert_eq!(err.kind(), VgErrorKind::InvalidSnapshot);
    assert_eq!(err.instance_id(), Some("a"));
}

proptest! {
    #[test]
    fn prop_change_set_is_deterministic(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let first = compute_change_set(Some(&previous), &current).unwrap();
        let second = compute_change_set(Some(&previous), &current).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_self_diff_is_empty(s in snapshot_strategy()) {
        let cs = compute_change_set(Some(&s), &s).unwrap();
        prop_assert!(!cs.has_any_change());
        prop_assert_eq!(cs.change_count(), 0);
    }

    #[test]
    fn prop_added_and_changed_are_disjoint(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let cs = compute_change_set(Some(&previous), &current).unwrap();
        for added in &cs.added {
            prop_assert!(previous.facility(&added.id).is_none());
            prop_assert!(cs.status_change_for(&added.id).is_none());
            prop_assert_eq!(cs.added.iter().filter(|f| f.id == added.id).count(), 1);
        }
        for change in &cs.status_changed {
            prop_assert!(!cs.removed.contains(&change.facility_id));
            prop_assert_eq!(
                previous.facility(&change.facility_id).map(|f| f.status),
                Some(change.old_status)
            );
            prop_assert_eq!(
                current.facility(&change.facility_id).map(|f| f.status),
                Some(change.new_status)
            );
        }
    }
}
