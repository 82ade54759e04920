//! Pause reasons and the per-session pause ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Why the user paused.
///
/// On the wire a reason is a plain string: catalog options use their
/// snake_case key, anything else is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PauseReason {
    /// Extra rest between sets
    Rest,
    /// Waiting for a machine or weights
    Equipment,
    /// Water or snack break
    Hydration,
    /// Discomfort or pain
    Pain,
    /// Phone call, message, someone at the door
    Interruption,
    /// Free text entered by the user
    Other(String),
}

impl PauseReason {
    pub const CATALOG: [PauseReason; 5] = [
        PauseReason::Rest,
        PauseReason::Equipment,
        PauseReason::Hydration,
        PauseReason::Pain,
        PauseReason::Interruption,
    ];

    /// Parse user input. Catalog keys match case-insensitively; empty or
    /// whitespace-only input is rejected.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPauseReason);
        }
        let reason = match trimmed.to_ascii_lowercase().as_str() {
            "rest" => PauseReason::Rest,
            "equipment" => PauseReason::Equipment,
            "hydration" => PauseReason::Hydration,
            "pain" => PauseReason::Pain,
            "interruption" => PauseReason::Interruption,
            _ => PauseReason::Other(trimmed.to_string()),
        };
        Ok(reason)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PauseReason::Rest => "rest",
            PauseReason::Equipment => "equipment",
            PauseReason::Hydration => "hydration",
            PauseReason::Pain => "pain",
            PauseReason::Interruption => "interruption",
            PauseReason::Other(text) => text,
        }
    }

    /// Reject a hand-built `Other` that carries no text.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PauseReason::Other(text) if text.trim().is_empty() => {
                Err(ValidationError::EmptyPauseReason)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PauseReason {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PauseReason::parse(&value)
    }
}

impl From<PauseReason> for String {
    fn from(reason: PauseReason) -> Self {
        reason.as_str().to_string()
    }
}

/// One pause. `ended_at` is `None` while the pause is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseInterval {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub reason: PauseReason,
}

impl PauseInterval {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Length in whole seconds, `None` while open.
    pub fn duration_secs(&self) -> Option<u64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_seconds().max(0) as u64)
    }
}

/// Ordered pauses of one session. At most one interval is open, and it
/// is always the last. Closed intervals are never modified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PauseLedger {
    intervals: Vec<PauseInterval>,
}

impl PauseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intervals(&self) -> &[PauseInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn open_interval(&self) -> Option<&PauseInterval> {
        self.intervals.last().filter(|p| p.is_open())
    }

    /// Open a new interval. Returns `false` when one is already open.
    pub(crate) fn open(&mut self, at: DateTime<Utc>, reason: PauseReason) -> bool {
        if self.open_interval().is_some() {
            return false;
        }
        self.intervals.push(PauseInterval {
            started_at: at,
            ended_at: None,
            reason,
        });
        true
    }

    /// Close the open interval, if any, returning its length.
    pub(crate) fn close(&mut self, at: DateTime<Utc>) -> Option<u64> {
        let open = self.intervals.last_mut().filter(|p| p.is_open())?;
        open.ended_at = Some(at.max(open.started_at));
        open.duration_secs()
    }

    /// Sum of all closed interval lengths.
    pub fn closed_secs(&self) -> u64 {
        self.intervals.iter().filter_map(|p| p.duration_secs()).sum()
    }
}
