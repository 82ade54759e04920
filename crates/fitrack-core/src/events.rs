//! Events returned by session commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{PauseReason, SessionStatus};

/// What became of the notification a command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Waiting in the outbox for the next `retry_pending`.
    Pending,
    /// Never queued because the session has no remote id. Local state stands.
    Dropped,
}

/// Every session command produces an Event.
/// The presentation layer renders from these and from snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    SessionStarted {
        remote_id: String,
        routine_id: String,
        at: DateTime<Utc>,
    },
    SessionPaused {
        reason: PauseReason,
        effective_seconds: u64,
        sync: SyncState,
        at: DateTime<Utc>,
    },
    SessionResumed {
        paused_seconds: u64,
        sync: SyncState,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        elapsed_seconds: u64,
        effective_seconds: u64,
        sync: SyncState,
        at: DateTime<Utc>,
    },
    SessionAbandoned {
        elapsed_seconds: u64,
        effective_seconds: u64,
        sync: SyncState,
        at: DateTime<Utc>,
    },
    SetRecorded {
        exercise_index: usize,
        set_index: usize,
        at: DateTime<Utc>,
    },
    Ticked {
        status: SessionStatus,
        elapsed_seconds: u64,
        effective_seconds: u64,
        at: DateTime<Utc>,
    },
}
