//! # fitrack Core Library
//!
//! Core logic for the fitrack workout tracker: the lifecycle of a single
//! workout session and the adherence analytics derived from past sessions.
//! Screens and the CLI are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Session Engine**: a state machine over one workout that requires the
//!   caller to periodically invoke `tick()` to credit elapsed time
//! - **Sync**: the backend contract, an ordered retry outbox and a REST adapter
//! - **Stats**: lenient history parsing and streak/frequency analytics
//! - **Storage**: SQLite for the active session and history cache, TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: drives a [`WorkoutSession`] through its states
//! - [`SyncAdapter`]: what the engine needs from a backend
//! - [`AdherenceAnalyzer`]: computes [`AdherenceStats`] from a [`SessionHistory`]
//! - [`Clock`]: injectable time source

pub mod clock;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock, Ticker};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::{SessionEvent, SyncState};
pub use session::{
    CompletionSurvey, EngineSnapshot, Mood, Operation, PauseReason, Routine, SessionEngine,
    SessionStatus, SetRecord, WorkoutSession,
};
pub use stats::{AdherenceAnalyzer, AdherenceStats, HistoryRecord, HistoryStatus, SessionHistory};
pub use storage::{Config, Database};
pub use sync::{HistorySource, HttpSyncAdapter, MemoryAdapter, RetryPolicy, SyncAdapter, SyncError};
