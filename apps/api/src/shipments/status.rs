use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized lifecycle stage of a shipment.
///
/// Only the raw label is ever persisted; this value is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Draft,
    Progress,
    Complete,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 3] = [Self::Draft, Self::Progress, Self::Complete];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Progress => "progress",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels offered to coordinators in the status picker. Free-typed labels are
/// accepted too; these are suggestions, not an enumeration.
pub const STATUS_PRESETS: &[&str] = &[
    "Initializing Import",
    "Initializing Export",
    "Waiting for Courier Response",
    "Ready for Pickup",
    "In Transit",
    "Delivered",
    "Cancelled",
];

// Checked in this order; the first rule with a matching keyword wins.
const DRAFT_KEYWORDS: &[&str] = &["draft", "init"];
const PROGRESS_KEYWORDS: &[&str] = &["progress", "transit", "waiting"];
const COMPLETE_KEYWORDS: &[&str] = &["complete", "delivered"];

/// Maps a free-text status label to its canonical lifecycle stage.
///
/// Total: absent, blank and unrecognized labels all map to `Draft`. Labels
/// matching keywords from several rules resolve to the earliest rule, so
/// "Draft - In Transit" is `Draft` and "Waiting, complete soon" is `Progress`.
pub fn classify(raw: Option<&str>) -> CanonicalStatus {
    let label = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return CanonicalStatus::Draft,
    };

    let rules = [
        (DRAFT_KEYWORDS, CanonicalStatus::Draft),
        (PROGRESS_KEYWORDS, CanonicalStatus::Progress),
        (COMPLETE_KEYWORDS, CanonicalStatus::Complete),
    ];

    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| label.contains(k)))
        .map(|(_, status)| *status)
        .unwrap_or(CanonicalStatus::Draft)
}
