//! The backend contract consumed by the session engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::Operation;
use crate::stats::SessionHistory;

use super::types::SyncError;
use super::wire::{
    AbandonNotice, Ack, CompletionReport, CreateSessionRequest, PauseNotice, ResumeNotice, SyncOp,
};

/// Remote session store.
///
/// Every call may fail. How a failure affects local state is decided by
/// the engine, not the adapter:
/// - `create` failing blocks `start`.
/// - `pause`/`resume` failing leaves local state alone and queues a retry.
/// - `complete`/`abandon` failing leaves the session terminal and flagged
///   `sync_pending` until a retry succeeds.
pub trait SyncAdapter: Send + Sync {
    /// Create the remote session and return its id.
    fn create(&self, request: &CreateSessionRequest) -> Result<String, SyncError>;

    fn pause(&self, remote_id: &str, notice: &PauseNotice) -> Result<Ack, SyncError>;

    fn resume(&self, remote_id: &str, notice: &ResumeNotice) -> Result<Ack, SyncError>;

    fn complete(&self, remote_id: &str, report: &CompletionReport) -> Result<Ack, SyncError>;

    fn abandon(&self, remote_id: &str, notice: &AbandonNotice) -> Result<Ack, SyncError>;
}

impl<T: SyncAdapter + ?Sized> SyncAdapter for Box<T> {
    fn create(&self, request: &CreateSessionRequest) -> Result<String, SyncError> {
        (**self).create(request)
    }

    fn pause(&self, remote_id: &str, notice: &PauseNotice) -> Result<Ack, SyncError> {
        (**self).pause(remote_id, notice)
    }

    fn resume(&self, remote_id: &str, notice: &ResumeNotice) -> Result<Ack, SyncError> {
        (**self).resume(remote_id, notice)
    }

    fn complete(&self, remote_id: &str, report: &CompletionReport) -> Result<Ack, SyncError> {
        (**self).complete(remote_id, report)
    }

    fn abandon(&self, remote_id: &str, notice: &AbandonNotice) -> Result<Ack, SyncError> {
        (**self).abandon(remote_id, notice)
    }
}

/// Read path for the user's terminal sessions.
pub trait HistorySource {
    fn fetch_history(&self) -> Result<SessionHistory, SyncError>;
}

/// A call received by [`MemoryAdapter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RecordedCall {
    Create(CreateSessionRequest),
    Notify { remote_id: String, op: SyncOp },
}

/// How an injected failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Network,
    Rejected(u16),
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    calls: Vec<RecordedCall>,
    failures: HashMap<Operation, FailureMode>,
}

/// In-process backend.
///
/// Assigns sequential ids, records every successful call, and fails on
/// demand. Serves offline mode and tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `operation` call fail until [`recover`](Self::recover).
    pub fn fail(&self, operation: Operation, mode: FailureMode) {
        self.lock().failures.insert(operation, mode);
    }

    pub fn recover(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    pub fn recover_all(&self) {
        self.lock().failures.clear();
    }

    /// Successful calls in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Operations of successful notifications in arrival order.
    pub fn notified_operations(&self) -> Vec<Operation> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Notify { op, .. } => Some(op.operation()),
                RecordedCall::Create(_) => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, operation: Operation) -> Result<(), SyncError> {
        match self.lock().failures.get(&operation) {
            None => Ok(()),
            Some(FailureMode::Network) => Err(SyncError::Network(format!(
                "{operation} unreachable"
            ))),
            Some(FailureMode::Rejected(status)) => Err(SyncError::Rejected {
                status: *status,
                message: format!("{operation} rejected"),
            }),
        }
    }

    fn notify(&self, remote_id: &str, op: SyncOp) -> Result<Ack, SyncError> {
        self.check(op.operation())?;
        self.lock().calls.push(RecordedCall::Notify {
            remote_id: remote_id.to_string(),
            op,
        });
        Ok(Ack::default())
    }
}

impl SyncAdapter for MemoryAdapter {
    fn create(&self, request: &CreateSessionRequest) -> Result<String, SyncError> {
        self.check(Operation::Start)?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        state.calls.push(RecordedCall::Create(request.clone()));
        Ok(id)
    }

    fn pause(&self, remote_id: &str, notice: &PauseNotice) -> Result<Ack, SyncError> {
        self.notify(remote_id, SyncOp::Pause(notice.clone()))
    }

    fn resume(&self, remote_id: &str, notice: &ResumeNotice) -> Result<Ack, SyncError> {
        self.notify(remote_id, SyncOp::Resume(notice.clone()))
    }

    fn complete(&self, remote_id: &str, report: &CompletionReport) -> Result<Ack, SyncError> {
        self.notify(remote_id, SyncOp::Complete(report.clone()))
    }

    fn abandon(&self, remote_id: &str, notice: &AbandonNotice) -> Result<Ack, SyncError> {
        self.notify(remote_id, SyncOp::Abandon(notice.clone()))
    }
}
