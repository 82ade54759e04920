//! Ordered outbox of notifications that have not reached the backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use super::adapter::SyncAdapter;
use super::types::SyncError;
use super::wire::SyncOp;

/// Backoff and give-up rules for queued notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub base_secs: u64,
    pub max_secs: u64,
    /// Attempts after which a pause/resume notice is dropped.
    /// Terminal notices are never dropped.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_secs: 5,
            max_secs: 300,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try after `attempts` failed ones.
    pub fn backoff(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::zero();
        }
        let factor = 1u64.checked_shl(attempts - 1).unwrap_or(u64::MAX);
        let secs = self.base_secs.saturating_mul(factor).min(self.max_secs);
        Duration::seconds(secs as i64)
    }
}

/// Notification waiting for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    pub remote_id: String,
    pub op: SyncOp,
    #[serde(default)]
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Outcome of one [`RetryQueue::flush`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub delivered: usize,
    pub failed: usize,
    pub dropped: usize,
    pub remaining: usize,
    /// Request ids of the dropped notifications.
    #[serde(default)]
    pub dropped_requests: Vec<Uuid>,
}

/// FIFO retry queue. Delivery never skips ahead of a failing entry, so the
/// backend sees notifications in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryQueue {
    pending: VecDeque<PendingOp>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notification. `failure` is the error of a delivery that was
    /// already attempted, if any.
    pub fn enqueue(
        &mut self,
        remote_id: &str,
        op: SyncOp,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
        failure: Option<&SyncError>,
    ) {
        let attempts = u32::from(failure.is_some());
        self.pending.push_back(PendingOp {
            remote_id: remote_id.to_string(),
            op,
            attempts,
            enqueued_at: now,
            next_attempt_at: now + policy.backoff(attempts),
            last_error: failure.map(|e| e.to_string()),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.pending.iter()
    }

    pub fn has_terminal(&self) -> bool {
        self.pending.iter().any(|p| p.op.is_terminal())
    }

    /// Time until the head of the queue may be retried.
    pub fn time_until_next_attempt(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.pending.front().map(|p| {
            if p.next_attempt_at > now {
                p.next_attempt_at - now
            } else {
                Duration::zero()
            }
        })
    }

    /// Deliver due entries in order until the queue empties, the head is
    /// not yet due, or a retryable failure occurs.
    pub fn flush<A>(&mut self, adapter: &A, now: DateTime<Utc>, policy: &RetryPolicy) -> RetryReport
    where
        A: SyncAdapter + ?Sized,
    {
        let mut report = RetryReport::default();

        while let Some(head) = self.pending.front_mut() {
            if head.next_attempt_at > now {
                break;
            }
            match head.op.deliver(adapter, &head.remote_id) {
                Ok(_) => {
                    tracing::debug!(
                        remote_id = %head.remote_id,
                        op = %head.op.operation(),
                        attempts = head.attempts,
                        "queued notification delivered"
                    );
                    self.pending.pop_front();
                    report.delivered += 1;
                }
                Err(err) => {
                    head.attempts += 1;
                    head.last_error = Some(err.to_string());
                    let give_up = !head.op.is_terminal()
                        && (!err.is_retryable() || head.attempts >= policy.max_attempts);
                    if give_up {
                        tracing::error!(
                            remote_id = %head.remote_id,
                            op = %head.op.operation(),
                            attempts = head.attempts,
                            error = %err,
                            "dropping notification after failed retries"
                        );
                        let request_id = head.op.request_id();
                        self.pending.pop_front();
                        report.dropped += 1;
                        report.dropped_requests.push(request_id);
                        continue;
                    }
                    head.next_attempt_at = now + policy.backoff(head.attempts);
                    tracing::warn!(
                        remote_id = %head.remote_id,
                        op = %head.op.operation(),
                        attempts = head.attempts,
                        error = %err,
                        "retry failed"
                    );
                    report.failed += 1;
                    break;
                }
            }
        }

        report.remaining = self.pending.len();
        report
    }
}
