//! Session status and the transition table.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> InProgress <-> Paused -> (Completed | Abandoned)
//!               InProgress -------------> (Completed | Abandoned)
//! ```
//!
//! [`transition`] is the single place that decides legality. The engine
//! asks it before any side effect and writes the returned status only
//! after the side effects succeeded.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// `Completed` or `Abandoned`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }

    /// Started and not yet terminal.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::InProgress | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

/// A user intent addressed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Complete,
    Abandon,
    RecordSet,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Complete => "complete",
            Operation::Abandon => "abandon",
            Operation::RecordSet => "log a set for",
        };
        f.write_str(verb)
    }
}

/// Status that `operation` leads to from `from`, or `InvalidTransition`.
pub fn transition(from: SessionStatus, operation: Operation) -> Result<SessionStatus, SessionError> {
    use Operation as Op;
    use SessionStatus as S;

    let next = match (from, operation) {
        (S::NotStarted, Op::Start) => S::InProgress,
        (S::InProgress, Op::Pause) => S::Paused,
        (S::Paused, Op::Resume) => S::InProgress,
        (S::InProgress | S::Paused, Op::Complete) => S::Completed,
        (S::InProgress | S::Paused, Op::Abandon) => S::Abandoned,
        (S::InProgress | S::Paused, Op::RecordSet) => from,
        _ => {
            return Err(SessionError::InvalidTransition {
                state: from,
                operation,
            })
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionStatus; 5] = [
        SessionStatus::NotStarted,
        SessionStatus::InProgress,
        SessionStatus::Paused,
        SessionStatus::Completed,
        SessionStatus::Abandoned,
    ];

    #[test]
    fn happy_path() {
        let s = transition(SessionStatus::NotStarted, Operation::Start).unwrap();
        let s = transition(s, Operation::Pause).unwrap();
        let s = transition(s, Operation::Resume).unwrap();
        let s = transition(s, Operation::Complete).unwrap();
        assert_eq!(s, SessionStatus::Completed);
    }

    #[test]
    fn terminal_states_accept_nothing() {
        let ops = [
            Operation::Start,
            Operation::Pause,
            Operation::Resume,
            Operation::Complete,
            Operation::Abandon,
            Operation::RecordSet,
        ];
        for state in [SessionStatus::Completed, SessionStatus::Abandoned] {
            for op in ops {
                assert!(transition(state, op).is_err(), "{state:?} accepted {op:?}");
            }
        }
    }

    #[test]
    fn pause_only_from_in_progress() {
        for state in ALL_STATES {
            let result = transition(state, Operation::Pause);
            assert_eq!(result.is_ok(), state == SessionStatus::InProgress);
        }
    }

    #[test]
    fn complete_closes_an_open_pause() {
        assert_eq!(
            transition(SessionStatus::Paused, Operation::Complete).unwrap(),
            SessionStatus::Completed
        );
        assert_eq!(
            transition(SessionStatus::Paused, Operation::Abandon).unwrap(),
            SessionStatus::Abandoned
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(SessionStatus::NotStarted.to_string(), "not started");
    }
}
