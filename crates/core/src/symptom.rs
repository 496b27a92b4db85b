//! Symptoms and triage tiers.

use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use triage_types::Severity;

/// A reported symptom with optional qualifiers.
///
/// `name` is always held in normalised form (see [`Symptom::normalise`]) so two reports of
/// "Sore Throat" and "sore_throat" compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symptom {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Symptom {
    /// Builds a symptom with no qualifiers.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if the name normalises to nothing.
    pub fn new(name: &str) -> TriageResult<Self> {
        let normalised = Self::normalise(name);
        if normalised.is_empty() {
            return Err(TriageError::InvalidInput(
                "symptom name cannot be empty".into(),
            ));
        }
        Ok(Self {
            name: normalised,
            severity: None,
            duration: None,
        })
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attaches a duration qualifier; blank durations are treated as missing.
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        let duration = duration.into();
        let trimmed = duration.trim();
        self.duration = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Canonical token form: trimmed, lower-case, runs of spaces/hyphens as single `_`.
    pub fn normalise(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut pending_sep = false;
        for ch in raw.trim().chars() {
            if ch.is_whitespace() || ch == '-' || ch == '_' {
                pending_sep = !out.is_empty();
                continue;
            }
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.extend(ch.to_lowercase());
        }
        out
    }

    /// True when both the severity and the duration qualifier were supplied.
    pub fn is_qualified(&self) -> bool {
        self.severity.is_some() && self.duration.is_some()
    }
}

/// Triage tier, declared from most to least urgent.
///
/// Ordering follows [`TriageTier::urgency`], so `Emergency` is the *greatest* value and `max()`
/// always picks the more cautious tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageTier {
    Emergency,
    Urgent,
    Routine,
    SelfCare,
}

impl TriageTier {
    /// All tiers, most urgent first.
    pub const ALL: [TriageTier; 4] = [
        TriageTier::Emergency,
        TriageTier::Urgent,
        TriageTier::Routine,
        TriageTier::SelfCare,
    ];

    /// Urgency rank, higher is more urgent.
    pub fn urgency(self) -> u8 {
        match self {
            TriageTier::Emergency => 3,
            TriageTier::Urgent => 2,
            TriageTier::Routine => 1,
            TriageTier::SelfCare => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriageTier::Emergency => "EMERGENCY",
            TriageTier::Urgent => "URGENT",
            TriageTier::Routine => "ROUTINE",
            TriageTier::SelfCare => "SELF_CARE",
        }
    }
}

impl Ord for TriageTier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.urgency().cmp(&other.urgency())
    }
}

impl PartialOrd for TriageTier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TriageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriageTier {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Symptom::normalise(s).as_str() {
            "emergency" => Ok(TriageTier::Emergency),
            "urgent" => Ok(TriageTier::Urgent),
            "routine" => Ok(TriageTier::Routine),
            "self_care" | "selfcare" => Ok(TriageTier::SelfCare),
            other => Err(TriageError::InvalidInput(format!(
                "unknown triage tier '{}'",
                other
            ))),
        }
    }
}
