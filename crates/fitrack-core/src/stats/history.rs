//! Past session records as delivered by the backend or the local cache.
//!
//! Parsing never fails. A field that is missing or has the wrong shape is
//! replaced by its default and logged, so one bad record cannot break an
//! analytics pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::session::{SessionStatus, WorkoutSession};

/// Legacy names for the effective duration, in lookup order.
const DURATION_FIELDS: [&str; 3] = ["effective_seconds", "duration_seconds", "duration"];

/// Upper bound for a plausible session duration: one week.
const MAX_SESSION_SECS: u64 = 7 * 24 * 3600;

/// Final status of a historical session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Completed,
    Abandoned,
    /// Missing, unrecognised, or a non-terminal status.
    #[default]
    Unknown,
}

impl HistoryStatus {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "completed" | "complete" => Self::Completed,
            "abandoned" => Self::Abandoned,
            _ => Self::Unknown,
        }
    }
}

impl From<SessionStatus> for HistoryStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Completed => Self::Completed,
            SessionStatus::Abandoned => Self::Abandoned,
            _ => Self::Unknown,
        }
    }
}

/// One past session. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub id: Option<String>,
    pub routine_id: Option<String>,
    pub status: HistoryStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub effective_seconds: Option<u64>,
}

impl HistoryRecord {
    /// Read a record from arbitrary JSON.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::warn!(kind = json_kind(value), "history record is not an object");
            return Self::default();
        };

        let record = Self {
            id: object.get("id").and_then(text_or_number),
            routine_id: object.get("routine_id").and_then(text_or_number),
            status: object
                .get("status")
                .and_then(Value::as_str)
                .map(HistoryStatus::parse)
                .unwrap_or_default(),
            started_at: object.get("started_at").and_then(timestamp),
            ended_at: object.get("ended_at").and_then(timestamp),
            created_at: object.get("created_at").and_then(timestamp),
            effective_seconds: DURATION_FIELDS
                .iter()
                .find_map(|key| object.get(*key).and_then(seconds)),
        };

        if record.status == HistoryStatus::Unknown || record.activity_time().is_none() {
            tracing::warn!(
                id = record.id.as_deref().unwrap_or(""),
                status = ?record.status,
                "history record is incomplete, using defaults"
            );
        }
        record
    }

    pub fn is_completed(&self) -> bool {
        self.status == HistoryStatus::Completed
    }

    /// The instant that decides which calendar day the session belongs to.
    pub fn activity_time(&self) -> Option<DateTime<Utc>> {
        self.ended_at.or(self.started_at).or(self.created_at)
    }
}

impl<'de> Deserialize<'de> for HistoryRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl From<&WorkoutSession> for HistoryRecord {
    fn from(session: &WorkoutSession) -> Self {
        Self {
            id: Some(
                session
                    .id
                    .clone()
                    .unwrap_or_else(|| session.local_id.to_string()),
            ),
            routine_id: Some(session.routine_id.clone()),
            status: session.status.into(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            created_at: session.started_at,
            effective_seconds: Some(session.effective_seconds()),
        }
    }
}

/// Append-only list of past sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    records: Vec<HistoryRecord>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a bare array, `{"sessions": [...]}` or `{"data": [...]}`.
    /// `null` and any other shape yield an empty history.
    pub fn from_json(value: &Value) -> Self {
        let items = match value {
            Value::Array(items) => Some(items),
            Value::Object(object) => ["sessions", "data"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_array)),
            _ => None,
        };

        match items {
            Some(items) => items.iter().map(HistoryRecord::from_value).collect(),
            None => {
                if !value.is_null() {
                    tracing::warn!(kind = json_kind(value), "unrecognised history payload");
                }
                Self::default()
            }
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<HistoryRecord> for SessionHistory {
    fn from_iter<I: IntoIterator<Item = HistoryRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SessionHistory {
    type Item = &'a HistoryRecord;
    type IntoIter = std::slice::Iter<'a, HistoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_or_number(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Non-negative whole seconds from an integer, float or numeric string.
/// Anything longer than [`MAX_SESSION_SECS`] is treated as garbage.
fn seconds(value: &Value) -> Option<u64> {
    let raw = match value {
        Value::Number(n) => n.as_u64().map(|v| v as f64).or_else(|| n.as_f64()),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let secs = raw.round() as u64;
    if secs > MAX_SESSION_SECS {
        tracing::warn!(secs, "ignoring implausible session duration");
        return None;
    }
    Some(secs)
}
