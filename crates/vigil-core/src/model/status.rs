//! Facility and instance status values

use serde::{Deserialize, Serialize};

/// Health of a facility or instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    Up,
    Degraded,
    Down,
    Unknown,
}

impl FacilityStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, FacilityStatus::Up)
    }

    /// User-facing caption
    pub fn caption(&self) -> &'static str {
        match self {
            FacilityStatus::Up => "Online",
            FacilityStatus::Degraded => "Issues",
            FacilityStatus::Down => "Offline",
            FacilityStatus::Unknown => "Unknown",
        }
    }

    /// Single-character marker for compact text output
    pub fn icon(&self) -> &'static str {
        match self {
            FacilityStatus::Up => "✓",
            FacilityStatus::Degraded => "!",
            FacilityStatus::Down => "✗",
            FacilityStatus::Unknown => "?",
        }
    }
}

impl std::fmt::Display for FacilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FacilityStatus::Up => "Up",
            FacilityStatus::Degraded => "Degraded",
            FacilityStatus::Down => "Down",
            FacilityStatus::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Roll a set of statuses up into one summary status.
///
/// - no members: `Unknown`
/// - every member `Down`: `Down`
/// - every member `Unknown`: `Unknown`
/// - any member not `Up`: `Degraded`
/// - otherwise `Up`
pub fn summarize_status<I>(statuses: I) -> FacilityStatus
where
    I: IntoIterator<Item = FacilityStatus>,
{
    let mut total = 0usize;
    let mut down = 0usize;
    let mut unknown = 0usize;
    let mut impaired = false;

    for status in statuses {
        total += 1;
        match status {
            FacilityStatus::Up => {}
            FacilityStatus::Degraded => impaired = true,
            FacilityStatus::Down => {
                impaired = true;
                down += 1;
            }
            FacilityStatus::Unknown => {
                impaired = true;
                unknown += 1;
            }
        }
    }

    if total == 0 {
        FacilityStatus::Unknown
    } else if down == total {
        FacilityStatus::Down
    } else if unknown == total {
        FacilityStatus::Unknown
    } else if impaired {
        FacilityStatus::Degraded
    } else {
        FacilityStatus::Up
    }
}
