use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use vigil_core::{Facility, FacilityStatus, Instance, Snapshot};

/// Snapshot generated at a fixed instant
#[allow(dead_code)]
pub fn snapshot(facilities: Vec<Facility>) -> Snapshot {
    Snapshot::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap(), facilities)
}

#[allow(dead_code)]
pub fn facility(id: &str, status: FacilityStatus) -> Facility {
    Facility::new(id, status)
}

#[allow(dead_code)]
pub fn status_strategy() -> impl Strategy<Value = FacilityStatus> + Clone {
    prop_oneof![
        Just(FacilityStatus::Up),
        Just(FacilityStatus::Degraded),
        Just(FacilityStatus::Down),
        Just(FacilityStatus::Unknown),
    ]
}

/// Valid snapshots: ids drawn from a small pool so that pairs overlap
#[allow(dead_code)]
pub fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    let instance_ids = prop::sample::subsequence(vec!["a", "b", "c", "d"], 0..=4);
    let facility_parts = (status_strategy(), instance_ids, any::<bool>())
        .prop_flat_map(|(status, ids, dns)| {
            let n = ids.len();
            (
                Just(status),
                Just(ids),
                prop::collection::vec(status_strategy(), n),
                Just(dns),
            )
        });
    let ids = prop::sample::subsequence(vec!["web", "db", "mail", "dns", "cdn", "irc"], 1..=6);
    ids.prop_flat_map(move |ids| {
        let n = ids.len();
        (Just(ids), prop::collection::vec(facility_parts.clone(), n))
    })
    .prop_map(|(ids, parts)| {
        let facilities = ids
            .into_iter()
            .zip(parts)
            .map(|(id, (status, instance_ids, instance_statuses, dns))| {
                let mut f = Facility::new(id, status).with_dns_issue(dns);
                for (iid, istatus) in instance_ids.into_iter().zip(instance_statuses) {
                    f = f.with_instance(Instance::new(iid, istatus));
                }
                f
            })
            .collect();
        snapshot(facilities)
    })
}
