//! mIRC-formatted report lines.
//!
//! Entries are packed several to a line; a line takes at most
//! [`ENTRIES_PER_LINE`] entries and, unless a single entry is longer on its
//! own, stays within [`LINE_BYTE_LIMIT`] bytes of UTF-8 including markup.

use vigil_core::render::{EntryChange, ReportEntry, ReportScope, ReportView};
use vigil_core::FacilityStatus;

pub const LINE_BYTE_LIMIT: usize = 190;
pub const ENTRIES_PER_LINE: usize = 3;

const BOLD: char = '\x02';
const COLOUR: char = '\x03';
const ENTRY_SEPARATOR: &str = "  ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Red,
    LightRed,
    LightYellow,
    LightGreen,
    Grey,
}

impl Colour {
    fn code(self) -> &'static str {
        match self {
            Colour::Red => "05",
            Colour::LightRed => "04",
            Colour::LightYellow => "08",
            Colour::LightGreen => "09",
            Colour::Grey => "14",
        }
    }

    fn for_status(status: FacilityStatus) -> Self {
        match status {
            FacilityStatus::Up => Colour::LightGreen,
            FacilityStatus::Degraded => Colour::LightYellow,
            FacilityStatus::Down => Colour::LightRed,
            FacilityStatus::Unknown => Colour::Grey,
        }
    }

    fn apply(self, text: &str) -> String {
        format!("{COLOUR}{}{text}{COLOUR}", self.code())
    }
}

fn bold(text: &str) -> String {
    format!("{BOLD}{text}{BOLD}")
}

fn status_markup(status: FacilityStatus) -> String {
    let colour = Colour::for_status(status);
    format!(
        "{} {}",
        colour.apply(status.icon()),
        colour.apply(status.caption())
    )
}

fn header_markup(view: &ReportView) -> String {
    let lead = match view.scope {
        ReportScope::Full => format!("{} - Overall Status:", view.title),
        ReportScope::ChangesOnly => format!("{} - Changes detected, Overall Status:", view.title),
    };
    format!(
        "{} {} {}",
        bold(&lead),
        status_markup(view.overall),
        Colour::Grey.apply(&format!(
            "(last update: {})",
            view.generated_at.format(TIMESTAMP_FORMAT)
        ))
    )
}

fn entry_markup(entry: &ReportEntry) -> String {
    let label = bold(&format!("{}:", entry.label));
    match (entry.change, entry.previous) {
        (EntryChange::Removed, _) => format!("{label} {}", Colour::Grey.apply("removed")),
        (EntryChange::Added, _) => format!("{label} {} (new)", status_markup(entry.status)),
        (EntryChange::StatusChanged, Some(previous)) => format!(
            "{label} {} -> {}",
            Colour::for_status(previous).apply(previous.caption()),
            status_markup(entry.status)
        ),
        _ => format!("{label} {}", status_markup(entry.status)),
    }
}

/// Pack pre-formatted items into lines under the byte and count limits.
pub fn pack_entries(items: &[String], byte_limit: usize, per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut count = 0;

    for item in items {
        let needed = if count == 0 {
            item.len()
        } else {
            line.len() + ENTRY_SEPARATOR.len() + item.len()
        };
        if count > 0 && (count >= per_line || needed > byte_limit) {
            lines.push(std::mem::take(&mut line));
            count = 0;
        }
        if count > 0 {
            line.push_str(ENTRY_SEPARATOR);
        }
        line.push_str(item);
        count += 1;
    }
    if count > 0 {
        lines.push(line);
    }
    lines
}

/// Operational notice in red
pub fn format_alert(text: &str) -> String {
    Colour::Red.apply(text)
}

/// Report as IRC lines: header, notes, packed entries, footer.
pub fn format_report(view: &ReportView) -> Vec<String> {
    let mut lines = vec![header_markup(view)];

    if let Some(due) = view.stale_since {
        lines.push(Colour::Grey.apply(&format!(
            "Note: this report is outdated; a refresh was expected at {}.",
            due.format(TIMESTAMP_FORMAT)
        )));
    }
    if let Some(notice) = &view.dns_notice {
        lines.push(notice.clone());
    }

    let entries: Vec<String> = view.entries.iter().map(entry_markup).collect();
    lines.extend(pack_entries(&entries, LINE_BYTE_LIMIT, ENTRIES_PER_LINE));

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
