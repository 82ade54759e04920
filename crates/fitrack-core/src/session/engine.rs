//! Workout session engine.
//!
//! The engine owns one [`WorkoutSession`] and is its only writer. Each
//! command asks [`transition`] for legality first, so a rejected command
//! leaves the session untouched. Time is credited by ticks pumped through
//! [`SessionEngine::tick`]; there is no internal thread.
//!
//! Only `start` waits for the backend. Every later command commits locally,
//! queues its notification and returns; [`SessionEngine::retry_pending`]
//! delivers the queue when the owner pumps it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(&routine, adapter, clock, RetryPolicy::default());
//! engine.start()?;
//! // From the UI loop, once a second or on foreground:
//! engine.tick();
//! engine.retry_pending();
//! engine.pause(PauseReason::parse("rest")?)?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Routine, SetRecord, WorkoutSession};
use super::pause::PauseReason;
use super::state::{transition, Operation, SessionStatus};
use super::survey::CompletionSurvey;
use crate::clock::Clock;
use crate::error::{SessionError, ValidationError};
use crate::events::{SessionEvent, SyncState};
use crate::sync::{
    AbandonNotice, CompletionReport, CreateSessionRequest, PauseNotice, ResumeNotice, RetryPolicy,
    RetryQueue, RetryReport, SyncAdapter, SyncOp,
};

/// Everything needed to rebuild an engine after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub session: WorkoutSession,
    #[serde(default)]
    pub outbox: RetryQueue,
}

pub struct SessionEngine<A: SyncAdapter> {
    session: WorkoutSession,
    outbox: RetryQueue,
    adapter: A,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl<A: SyncAdapter> SessionEngine<A> {
    /// Create an engine for a fresh attempt at `routine`.
    pub fn new(routine: &Routine, adapter: A, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            session: WorkoutSession::from_routine(routine),
            outbox: RetryQueue::new(),
            adapter,
            clock,
            policy,
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// The ticker resumes from its last credited instant, so time spent
    /// while the process was suspended is credited on the next tick.
    pub fn restore(
        snapshot: EngineSnapshot,
        adapter: A,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        let mut engine = Self {
            session: snapshot.session,
            outbox: snapshot.outbox,
            adapter,
            clock,
            policy,
        };
        engine.session.sync_pending = engine.outbox.has_terminal();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn outbox(&self) -> &RetryQueue {
        &self.outbox
    }

    /// True while a terminal notification has not reached the backend.
    pub fn sync_pending(&self) -> bool {
        self.session.sync_pending
    }

    /// Time until the head of the outbox may be retried, `None` when empty.
    pub fn next_retry_in(&self) -> Option<chrono::Duration> {
        self.outbox.time_until_next_attempt(self.clock.now())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            session: self.session.clone(),
            outbox: self.outbox.clone(),
        }
    }

    pub fn into_snapshot(self) -> EngineSnapshot {
        EngineSnapshot {
            session: self.session,
            outbox: self.outbox,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create the remote session, then start the clock.
    ///
    /// If the backend does not confirm an id the session stays
    /// `NotStarted` and no time is counted.
    pub fn start(&mut self) -> Result<SessionEvent, SessionError> {
        let next = transition(self.session.status, Operation::Start)?;
        let started_at = self.clock.now();
        let request = CreateSessionRequest {
            routine_id: self.session.routine_id.clone(),
            routine_name: self.session.routine_name.clone(),
            started_at,
            request_id: Uuid::new_v4(),
        };

        let remote_id = self.adapter.create(&request).map_err(|source| {
            tracing::warn!(
                local_id = %self.session.local_id,
                routine_id = %self.session.routine_id,
                error = %source,
                "remote session creation failed"
            );
            SessionError::SyncFailure {
                operation: Operation::Start,
                source,
            }
        })?;

        let now = self.clock.now();
        self.session.id = Some(remote_id.clone());
        self.session.started_at = Some(started_at);
        self.session.durations.begin(now);
        self.set_status(next);

        Ok(SessionEvent::SessionStarted {
            remote_id,
            routine_id: self.session.routine_id.clone(),
            at: now,
        })
    }

    pub fn pause(&mut self, reason: PauseReason) -> Result<SessionEvent, SessionError> {
        let next = transition(self.session.status, Operation::Pause)?;
        reason.validate()?;

        let now = self.clock.now();
        self.session.durations.credit(now, self.session.status);
        self.session.pauses.open(now, reason.clone());
        self.set_status(next);

        let sync = self.dispatch(
            SyncOp::Pause(PauseNotice {
                reason: reason.clone(),
                paused_at: now,
                request_id: Uuid::new_v4(),
            }),
            now,
        );

        Ok(SessionEvent::SessionPaused {
            reason,
            effective_seconds: self.session.effective_seconds(),
            sync,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Result<SessionEvent, SessionError> {
        let next = transition(self.session.status, Operation::Resume)?;

        let now = self.clock.now();
        self.session.durations.credit(now, self.session.status);
        let paused_seconds = self.session.pauses.close(now).unwrap_or(0);
        self.session.durations.begin(now);
        self.set_status(next);

        let sync = self.dispatch(
            SyncOp::Resume(ResumeNotice {
                resumed_at: now,
                request_id: Uuid::new_v4(),
            }),
            now,
        );

        Ok(SessionEvent::SessionResumed {
            paused_seconds,
            sync,
            at: now,
        })
    }

    /// Finish the workout. An open pause is closed first.
    pub fn complete(&mut self, survey: CompletionSurvey) -> Result<SessionEvent, SessionError> {
        let next = transition(self.session.status, Operation::Complete)?;
        survey.validate()?;

        let now = self.clock.now();
        self.stop_counting(now);
        self.session.survey = Some(survey.clone());
        self.set_status(next);

        let report = CompletionReport {
            ended_at: now,
            elapsed_seconds: self.session.elapsed_seconds(),
            effective_seconds: self.session.effective_seconds(),
            survey,
            exercises: self.session.exercises.clone(),
            request_id: Uuid::new_v4(),
        };
        let sync = self.dispatch(SyncOp::Complete(report), now);

        Ok(SessionEvent::SessionCompleted {
            elapsed_seconds: self.session.elapsed_seconds(),
            effective_seconds: self.session.effective_seconds(),
            sync,
            at: now,
        })
    }

    /// Give up on the workout. An open pause is closed first.
    pub fn abandon(&mut self) -> Result<SessionEvent, SessionError> {
        let next = transition(self.session.status, Operation::Abandon)?;

        let now = self.clock.now();
        self.stop_counting(now);
        self.set_status(next);

        let notice = AbandonNotice {
            ended_at: now,
            elapsed_seconds: self.session.elapsed_seconds(),
            effective_seconds: self.session.effective_seconds(),
            request_id: Uuid::new_v4(),
        };
        let sync = self.dispatch(SyncOp::Abandon(notice), now);

        Ok(SessionEvent::SessionAbandoned {
            elapsed_seconds: self.session.elapsed_seconds(),
            effective_seconds: self.session.effective_seconds(),
            sync,
            at: now,
        })
    }

    /// Append a performed set to the exercise at `exercise_index`.
    pub fn record_set(
        &mut self,
        exercise_index: usize,
        set: SetRecord,
    ) -> Result<SessionEvent, SessionError> {
        transition(self.session.status, Operation::RecordSet)?;
        let exercise = self.exercise_mut(exercise_index)?;
        exercise.sets.push(set);
        let set_index = exercise.sets.len() - 1;

        Ok(SessionEvent::SetRecorded {
            exercise_index,
            set_index,
            at: self.clock.now(),
        })
    }

    /// Replace an already logged set.
    pub fn update_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        set: SetRecord,
    ) -> Result<SessionEvent, SessionError> {
        transition(self.session.status, Operation::RecordSet)?;
        let exercise = self.exercise_mut(exercise_index)?;
        let len = exercise.sets.len();
        let slot = exercise
            .sets
            .get_mut(set_index)
            .ok_or_else(|| ValidationError::OutOfBounds {
                collection: "sets".into(),
                index: set_index,
                len,
            })?;
        *slot = set;

        Ok(SessionEvent::SetRecorded {
            exercise_index,
            set_index,
            at: self.clock.now(),
        })
    }

    /// Credit elapsed ticks. Returns `Some(Event::Ticked)` when time moved.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        let now = self.clock.now();
        let credited = self.session.durations.credit(now, self.session.status);
        if credited == 0 {
            return None;
        }
        tracing::trace!(credited, status = %self.session.status, "ticked");
        Some(SessionEvent::Ticked {
            status: self.session.status,
            elapsed_seconds: self.session.elapsed_seconds(),
            effective_seconds: self.session.effective_seconds(),
            at: now,
        })
    }

    /// Make sure a live session is ticking, e.g. when the app returns to
    /// the foreground. A running ticker is left alone, so nothing is
    /// counted twice. Returns `true` if the ticker had to be started.
    pub fn resume_ticking(&mut self) -> bool {
        if !self.session.status.is_live() {
            return false;
        }
        self.session.durations.begin(self.clock.now())
    }

    /// Replay queued notifications that are due.
    pub fn retry_pending(&mut self) -> RetryReport {
        let now = self.clock.now();
        let report = self.outbox.flush(&self.adapter, now, &self.policy);
        self.session.sync_pending = self.outbox.has_terminal();
        if report.delivered > 0 || report.dropped > 0 {
            tracing::info!(
                local_id = %self.session.local_id,
                delivered = report.delivered,
                dropped = report.dropped,
                remaining = report.remaining,
                "outbox flushed"
            );
        }
        report
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// The only writer of `status`.
    fn set_status(&mut self, next: SessionStatus) {
        let previous = self.session.status;
        self.session.status = next;
        tracing::info!(
            local_id = %self.session.local_id,
            remote_id = self.session.id.as_deref().unwrap_or(""),
            from = %previous,
            to = %next,
            elapsed_seconds = self.session.elapsed_seconds(),
            effective_seconds = self.session.effective_seconds(),
            "session transition"
        );
    }

    fn stop_counting(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.session.durations.halt(now, self.session.status);
        self.session.pauses.close(now);
        self.session.ended_at = Some(now);
    }

    fn exercise_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut super::model::ExerciseAttempt, ValidationError> {
        let len = self.session.exercises.len();
        self.session
            .exercises
            .get_mut(index)
            .ok_or_else(|| ValidationError::OutOfBounds {
                collection: "exercises".into(),
                index,
                len,
            })
    }

    /// Queue `op` behind anything already waiting. Delivery happens in
    /// [`Self::retry_pending`].
    fn dispatch(&mut self, op: SyncOp, now: chrono::DateTime<chrono::Utc>) -> SyncState {
        let Some(remote_id) = self.session.id.clone() else {
            tracing::error!(
                local_id = %self.session.local_id,
                op = %op.operation(),
                "notification without remote id discarded"
            );
            return SyncState::Dropped;
        };
        let operation = op.operation();

        self.outbox.enqueue(&remote_id, op, now, &self.policy, None);
        self.session.sync_pending = self.outbox.has_terminal();
        tracing::debug!(
            remote_id = %remote_id,
            op = %operation,
            queued = self.outbox.len(),
            "notification queued"
        );
        SyncState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::{CatalogExercise, Mood};
    use crate::sync::{FailureMode, MemoryAdapter};
    use chrono::{TimeZone, Utc};

    fn routine() -> Routine {
        Routine {
            id: "r-pull".into(),
            name: "Pull Day".into(),
            exercises: vec![CatalogExercise {
                id: "row".into(),
                name: "Barbell Row".into(),
                planned_sets: 3,
                planned_reps: 10,
            }],
        }
    }

    fn setup() -> (SessionEngine<MemoryAdapter>, ManualClock, MemoryAdapter) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).unwrap());
        let adapter = MemoryAdapter::new();
        let engine = SessionEngine::new(
            &routine(),
            adapter.clone(),
            Arc::new(clock.clone()),
            RetryPolicy::default(),
        );
        (engine, clock, adapter)
    }

    fn survey() -> CompletionSurvey {
        CompletionSurvey::new(6, 7, Mood::Good, None).unwrap()
    }

    #[test]
    fn start_assigns_remote_id_and_begins_ticking() {
        let (mut engine, clock, _) = setup();
        let event = engine.start().unwrap();
        assert!(matches!(event, SessionEvent::SessionStarted { ref remote_id, .. } if remote_id == "mem-1"));
        assert_eq!(engine.status(), SessionStatus::InProgress);
        assert_eq!(engine.session().id.as_deref(), Some("mem-1"));

        clock.advance_secs(12);
        engine.tick();
        assert_eq!(engine.session().elapsed_seconds(), 12);
        assert_eq!(engine.session().effective_seconds(), 12);
    }

    #[test]
    fn failed_create_leaves_session_untouched() {
        let (mut engine, clock, adapter) = setup();
        adapter.fail(Operation::Start, FailureMode::Network);
        let before = engine.session().clone();

        let err = engine.start().unwrap_err();
        assert!(matches!(err, SessionError::SyncFailure { operation: Operation::Start, .. }));
        assert_eq!(engine.session(), &before);
        assert!(!engine.session().is_ticking());

        clock.advance_secs(30);
        assert!(engine.tick().is_none());
        assert_eq!(engine.session().elapsed_seconds(), 0);
    }

    #[test]
    fn pause_excludes_time_from_effective() {
        let (mut engine, clock, _) = setup();
        engine.start().unwrap();
        clock.advance_secs(60);
        engine.pause(PauseReason::Rest).unwrap();
        clock.advance_secs(45);
        engine.tick();
        engine.resume().unwrap();
        clock.advance_secs(15);
        engine.complete(survey()).unwrap();

        let session = engine.session();
        assert_eq!(session.elapsed_seconds(), 120);
        assert_eq!(session.effective_seconds(), 75);
        assert_eq!(session.pauses().closed_secs(), 45);
    }

    #[test]
    fn rejected_commands_do_not_mutate() {
        let (mut engine, _, _) = setup();
        let before = engine.session().clone();
        let err = engine.pause(PauseReason::Rest).unwrap_err();
        assert!(err.is_invalid_transition());
        assert!(engine.resume().unwrap_err().is_invalid_transition());
        assert!(engine.complete(survey()).unwrap_err().is_invalid_transition());
        assert!(engine.abandon().unwrap_err().is_invalid_transition());
        assert_eq!(engine.session(), &before);
    }

    #[test]
    fn blank_free_text_reason_is_rejected() {
        let (mut engine, _, _) = setup();
        engine.start().unwrap();
        let err = engine.pause(PauseReason::Other("   ".into())).unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::EmptyPauseReason)));
        assert_eq!(engine.status(), SessionStatus::InProgress);
        assert!(engine.session().pauses().is_empty());
    }

    #[test]
    fn complete_from_paused_closes_the_pause() {
        let (mut engine, clock, _) = setup();
        engine.start().unwrap();
        clock.advance_secs(10);
        engine.pause(PauseReason::Hydration).unwrap();
        clock.advance_secs(20);
        engine.complete(survey()).unwrap();

        let session = engine.session();
        assert!(session.pauses().open_interval().is_none());
        assert_eq!(session.pauses().closed_secs(), 20);
        assert_eq!(session.elapsed_seconds(), 30);
        assert_eq!(session.effective_seconds(), 10);
        assert!(session.ended_at.is_some());
        assert_eq!(session.survey, Some(survey()));
    }

    #[test]
    fn terminal_states_reject_everything() {
        let (mut engine, _, _) = setup();
        engine.start().unwrap();
        engine.abandon().unwrap();
        assert!(engine.abandon().unwrap_err().is_invalid_transition());
        assert!(engine.complete(survey()).unwrap_err().is_invalid_transition());
        assert!(engine.start().unwrap_err().is_invalid_transition());
        assert!(engine
            .record_set(0, SetRecord { weight: None, reps: 5, completed: true })
            .unwrap_err()
            .is_invalid_transition());
        assert_eq!(engine.session().survey, None);
    }

    #[test]
    fn commands_queue_without_calling_the_backend() {
        let (mut engine, _, adapter) = setup();
        engine.start().unwrap();

        let event = engine.pause(PauseReason::Equipment).unwrap();
        assert!(matches!(event, SessionEvent::SessionPaused { sync: SyncState::Pending, .. }));
        engine.resume().unwrap();
        assert_eq!(engine.outbox().len(), 2);
        assert!(adapter.notified_operations().is_empty());
        assert_eq!(engine.next_retry_in(), Some(chrono::Duration::zero()));

        let report = engine.retry_pending();
        assert_eq!(report.delivered, 2);
        assert_eq!(engine.next_retry_in(), None);
        assert_eq!(
            adapter.notified_operations(),
            vec![Operation::Pause, Operation::Resume]
        );
    }

    #[test]
    fn pause_failure_keeps_local_state_and_queues() {
        let (mut engine, _, adapter) = setup();
        engine.start().unwrap();
        adapter.fail(Operation::Pause, FailureMode::Network);

        engine.pause(PauseReason::Equipment).unwrap();
        let report = engine.retry_pending();
        assert_eq!(report.failed, 1);
        assert_eq!(engine.status(), SessionStatus::Paused);
        assert_eq!(engine.outbox().len(), 1);
        assert_eq!(engine.next_retry_in(), Some(chrono::Duration::seconds(5)));
        assert!(!engine.sync_pending());
    }

    #[test]
    fn later_notices_wait_behind_queued_ones() {
        let (mut engine, clock, adapter) = setup();
        engine.start().unwrap();
        adapter.fail(Operation::Pause, FailureMode::Network);
        engine.pause(PauseReason::Rest).unwrap();
        engine.retry_pending();
        adapter.recover_all();

        engine.resume().unwrap();
        assert_eq!(engine.retry_pending().delivered, 0);
        assert!(adapter.notified_operations().is_empty());

        clock.advance_secs(10);
        let report = engine.retry_pending();
        assert_eq!(report.delivered, 2);
        assert_eq!(
            adapter.notified_operations(),
            vec![Operation::Pause, Operation::Resume]
        );
    }

    #[test]
    fn terminal_sync_failure_flags_pending_and_never_reverts() {
        let (mut engine, clock, adapter) = setup();
        engine.start().unwrap();
        adapter.fail(Operation::Complete, FailureMode::Rejected(500));

        let event = engine.complete(survey()).unwrap();
        assert!(matches!(event, SessionEvent::SessionCompleted { sync: SyncState::Pending, .. }));
        assert_eq!(engine.status(), SessionStatus::Completed);
        assert!(engine.sync_pending());

        engine.retry_pending();
        clock.advance_secs(5);
        engine.retry_pending();
        assert_eq!(engine.status(), SessionStatus::Completed);
        assert!(engine.sync_pending());

        adapter.recover_all();
        clock.advance_secs(60);
        let report = engine.retry_pending();
        assert_eq!(report.delivered, 1);
        assert!(!engine.sync_pending());
    }

    #[test]
    fn rejected_pause_is_dropped() {
        let (mut engine, _, adapter) = setup();
        engine.start().unwrap();
        adapter.fail(Operation::Pause, FailureMode::Rejected(422));
        engine.pause(PauseReason::Rest).unwrap();

        let report = engine.retry_pending();
        assert_eq!(report.dropped, 1);
        assert!(engine.outbox().is_empty());
        assert_eq!(engine.status(), SessionStatus::Paused);
    }

    #[test]
    fn terminal_session_rejects_commands_without_mutation() {
        let (mut engine, clock, _) = setup();
        engine.start().unwrap();
        clock.advance_secs(40);
        engine.complete(survey()).unwrap();
        let before = engine.session().clone();
        let queued = engine.outbox().len();

        clock.advance_secs(10);
        assert!(engine.complete(survey()).unwrap_err().is_invalid_transition());
        assert_eq!(engine.session(), &before);
        assert!(engine.pause(PauseReason::Rest).unwrap_err().is_invalid_transition());
        assert_eq!(engine.session(), &before);
        assert!(engine.resume().unwrap_err().is_invalid_transition());
        assert!(engine.abandon().unwrap_err().is_invalid_transition());
        assert_eq!(engine.session(), &before);
        assert_eq!(engine.outbox().len(), queued);
    }

    #[test]
    fn abandoned_session_rejects_pause_without_mutation() {
        let (mut engine, clock, _) = setup();
        engine.start().unwrap();
        clock.advance_secs(5);
        engine.pause(PauseReason::Pain).unwrap();
        engine.abandon().unwrap();
        let before = engine.session().clone();

        clock.advance_secs(30);
        assert!(engine.pause(PauseReason::Rest).unwrap_err().is_invalid_transition());
        assert!(engine.abandon().unwrap_err().is_invalid_transition());
        assert!(engine.complete(survey()).unwrap_err().is_invalid_transition());
        assert!(engine.tick().is_none());
        assert_eq!(engine.session(), &before);
    }

    #[test]
    fn sets_are_logged_against_exercises() {
        let (mut engine, _, _) = setup();
        engine.start().unwrap();
        let set = SetRecord { weight: Some(60.0), reps: 10, completed: true };
        engine.record_set(0, set.clone()).unwrap();
        engine
            .update_set(0, 0, SetRecord { reps: 8, ..set })
            .unwrap();
        assert_eq!(engine.session().exercises[0].sets[0].reps, 8);

        let err = engine
            .record_set(3, SetRecord { weight: None, reps: 1, completed: false })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::OutOfBounds { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn restore_resumes_counting_without_double_count() {
        let (mut engine, clock, adapter) = setup();
        engine.start().unwrap();
        clock.advance_secs(30);
        engine.tick();
        let snapshot = engine.into_snapshot();

        clock.advance_secs(20);
        let mut restored = SessionEngine::restore(
            snapshot,
            adapter,
            Arc::new(clock.clone()),
            RetryPolicy::default(),
        );
        assert!(!restored.resume_ticking());
        restored.tick();
        assert_eq!(restored.session().elapsed_seconds(), 50);
    }
}
