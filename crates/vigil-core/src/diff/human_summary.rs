//! Human-readable summary renderer for change sets.

use crate::diff::model::{ChangeSet, InstanceChangeKind};

/// Render a Markdown summary of a [`ChangeSet`].
///
/// Intended for operators comparing two snapshot files by hand. Channel
/// output is produced by [`crate::render`], not here.
pub fn render_human_summary(change_set: &ChangeSet) -> String {
    let mut out = String::new();

    out.push_str("## Status Diff\n\n");
    out.push_str(&format!(
        "**Changes**: {}  \n**Baseline**: {}\n\n",
        change_set.change_count(),
        if change_set.baseline { "yes" } else { "no" }
    ));

    if change_set.baseline {
        out.push_str("### Facilities\n\n");
        for facility in &change_set.added {
            out.push_str(&format!("- `{}`: {}\n", facility.id, facility.status));
        }
        out.push('\n');
    } else if !change_set.has_any_change() {
        out.push_str("_No changes detected._\n");
    } else {
        if !change_set.added.is_empty() {
            out.push_str("### Added Facilities\n\n");
            for facility in &change_set.added {
                out.push_str(&format!("- `{}`: {}\n", facility.id, facility.status));
            }
            out.push('\n');
        }

        if !change_set.removed.is_empty() {
            out.push_str("### Removed Facilities\n\n");
            for id in &change_set.removed {
                out.push_str(&format!("- `{id}`\n"));
            }
            out.push('\n');
        }

        if !change_set.status_changed.is_empty() {
            out.push_str("### Status Changes\n\n");
            for change in &change_set.status_changed {
                out.push_str(&format!(
                    "- `{}`: {} → {}\n",
                    change.facility_id, change.old_status, change.new_status
                ));
            }
            out.push('\n');
        }

        if !change_set.instance_changed.is_empty() {
            out.push_str("### Instance Changes\n\n");
            for change in &change_set.instance_changed {
                let line = match (change.kind(), change.old_status, change.new_status) {
                    (InstanceChangeKind::Added, _, Some(new)) => format!("added ({new})"),
                    (InstanceChangeKind::Removed, Some(old), _) => format!("removed (was {old})"),
                    (_, Some(old), Some(new)) => format!("{old} → {new}"),
                    _ => "changed".to_string(),
                };
                out.push_str(&format!(
                    "- `{}/{}`: {}\n",
                    change.facility_id, change.instance_id, line
                ));
            }
            out.push('\n');
        }
    }

    if !change_set.dns_issues_active.is_empty() {
        out.push_str("### Active DNS Issues\n\n");
        out.push_str(&format!("- {}\n", change_set.dns_issues_active.join(", ")));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::StatusChange;
    use crate::model::FacilityStatus;

    #[test]
    fn test_summary_no_changes() {
        let summary = render_human_summary(&ChangeSet::default());
        assert!(summary.contains("_No changes detected._"));
        assert!(!summary.contains("Active DNS Issues"));
    }

    #[test]
    fn test_summary_lists_status_change() {
        let cs = ChangeSet {
            status_changed: vec![StatusChange {
                facility_id: "web".to_string(),
                old_status: FacilityStatus::Up,
                new_status: FacilityStatus::Down,
            }],
            dns_issues_active: vec!["mail".to_string()],
            ..ChangeSet::default()
        };
        let summary = render_human_summary(&cs);
        assert!(summary.contains("### Status Changes"));
        assert!(summary.contains("`web`: Up → Down"));
        assert!(summary.contains("- mail"));
    }
}
