//! Notification policy
//!
//! Decides, per adapter, whether a change set is worth posting and how much
//! of the report to render. The decision depends only on the change set, the
//! adapter's configured [`NotificationMode`] and whether this evaluation is
//! the adapter's initial baseline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diff::ChangeSet;

/// Per-adapter notification mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationMode {
    /// Post the complete current status on every cycle
    Always,
    /// Post the complete status when something changed, and once as a baseline
    #[default]
    ChangesWithBaseline,
    /// Post only what changed, never on a quiet cycle
    ChangesOnlyStrict,
}

impl NotificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMode::Always => "always",
            NotificationMode::ChangesWithBaseline => "changes-with-baseline",
            NotificationMode::ChangesOnlyStrict => "changes-only-strict",
        }
    }
}

impl std::fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(NotificationMode::Always),
            "changes-with-baseline" => Ok(NotificationMode::ChangesWithBaseline),
            "changes-only-strict" => Ok(NotificationMode::ChangesOnlyStrict),
            other => Err(format!(
                "unknown notification mode '{other}' (expected always, changes-with-baseline or changes-only-strict)"
            )),
        }
    }
}

/// What an adapter should render for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderDecision {
    Suppress,
    RenderFull,
    RenderChangesOnly,
}

impl RenderDecision {
    pub fn is_suppress(&self) -> bool {
        matches!(self, RenderDecision::Suppress)
    }
}

/// Policy trait for turning a change set into a render decision
pub trait NotificationPolicy {
    fn decide(&self, change_set: &ChangeSet, is_initial_baseline: bool) -> RenderDecision;
}

impl NotificationPolicy for NotificationMode {
    fn decide(&self, change_set: &ChangeSet, is_initial_baseline: bool) -> RenderDecision {
        let changed = change_set.has_any_change();
        match self {
            NotificationMode::Always => RenderDecision::RenderFull,
            NotificationMode::ChangesWithBaseline if changed || is_initial_baseline => {
                RenderDecision::RenderFull
            }
            NotificationMode::ChangesOnlyStrict if changed => RenderDecision::RenderChangesOnly,
            _ => RenderDecision::Suppress,
        }
    }
}

/// Evaluate `mode` against `change_set`
pub fn decide(
    change_set: &ChangeSet,
    mode: NotificationMode,
    is_initial_baseline: bool,
) -> RenderDecision {
    mode.decide(change_set, is_initial_baseline)
}
