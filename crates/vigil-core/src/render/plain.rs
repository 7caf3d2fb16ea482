//! Plain text rendering of a [`ReportView`].

use super::report_view::{EntryChange, ReportEntry, ReportScope, ReportView};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// First line of every report
pub fn header_text(view: &ReportView) -> String {
    let lead = match view.scope {
        ReportScope::Full => format!("{} - overall status", view.title),
        ReportScope::ChangesOnly => format!("{} - changes detected, overall status", view.title),
    };
    format!(
        "{lead}: {} (updated {})",
        view.overall.caption(),
        view.generated_at.format(TIMESTAMP_FORMAT)
    )
}

/// Text of one entry without markup
pub fn entry_text(entry: &ReportEntry) -> String {
    match entry.change {
        EntryChange::Unchanged => format!("{}: {}", entry.label, entry.status.caption()),
        EntryChange::Added => format!("{}: {} (new)", entry.label, entry.status.caption()),
        EntryChange::Removed => format!("{}: removed", entry.label),
        EntryChange::StatusChanged => match entry.previous {
            Some(previous) => format!(
                "{}: {} -> {}",
                entry.label,
                previous.caption(),
                entry.status.caption()
            ),
            None => format!("{}: {}", entry.label, entry.status.caption()),
        },
    }
}

/// Flatten a view into lines: header, notes, one line per entry, footer.
pub fn render_plain_lines(view: &ReportView) -> Vec<String> {
    let mut lines = vec![header_text(view)];

    if let Some(due) = view.stale_since {
        lines.push(format!(
            "Note: this report is outdated; a refresh was expected at {}.",
            due.format(TIMESTAMP_FORMAT)
        ));
    }
    if let Some(notice) = &view.dns_notice {
        lines.push(notice.clone());
    }

    lines.extend(view.entries.iter().map(entry_text));

    if view.hidden_impacted > 0 {
        lines.push(format!(
            "({} hidden facilities impacted)",
            view.hidden_impacted
        ));
    }
    if let Some(url) = &view.site_url {
        lines.push(format!("Details: {url}"));
    }

    lines
}
