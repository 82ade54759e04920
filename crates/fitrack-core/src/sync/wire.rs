//! Request and response bodies exchanged with the backend.
//!
//! Field names are the fixed snake_case vocabulary of the REST API.
//! Every inbound field defaults when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::session::{CompletionSurvey, ExerciseAttempt, Operation, PauseReason};

use super::adapter::SyncAdapter;
use super::types::SyncError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub routine_id: String,
    pub routine_name: String,
    pub started_at: DateTime<Utc>,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseNotice {
    pub reason: PauseReason,
    pub paused_at: DateTime<Utc>,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeNotice {
    pub resumed_at: DateTime<Utc>,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub effective_seconds: u64,
    #[serde(flatten)]
    pub survey: CompletionSurvey,
    #[serde(default)]
    pub exercises: Vec<ExerciseAttempt>,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonNotice {
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub effective_seconds: u64,
    pub request_id: Uuid,
}

/// Acknowledgement body. Backends may answer with an empty body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A notification that follows creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOp {
    Pause(PauseNotice),
    Resume(ResumeNotice),
    Complete(CompletionReport),
    Abandon(AbandonNotice),
}

impl SyncOp {
    pub fn operation(&self) -> Operation {
        match self {
            SyncOp::Pause(_) => Operation::Pause,
            SyncOp::Resume(_) => Operation::Resume,
            SyncOp::Complete(_) => Operation::Complete,
            SyncOp::Abandon(_) => Operation::Abandon,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncOp::Complete(_) | SyncOp::Abandon(_))
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            SyncOp::Pause(n) => n.request_id,
            SyncOp::Resume(n) => n.request_id,
            SyncOp::Complete(r) => r.request_id,
            SyncOp::Abandon(n) => n.request_id,
        }
    }

    /// Send this notification through `adapter`.
    pub fn deliver<A>(&self, adapter: &A, remote_id: &str) -> Result<Ack, SyncError>
    where
        A: SyncAdapter + ?Sized,
    {
        match self {
            SyncOp::Pause(notice) => adapter.pause(remote_id, notice),
            SyncOp::Resume(notice) => adapter.resume(remote_id, notice),
            SyncOp::Complete(report) => adapter.complete(remote_id, report),
            SyncOp::Abandon(notice) => adapter.abandon(remote_id, notice),
        }
    }
}

/// Accept ids sent as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
