//! Workout session lifecycle.
//!
//! [`SessionEngine`] drives one [`WorkoutSession`] through the states in
//! [`SessionStatus`]. Legality of every command is decided by
//! [`transition`]; time accounting lives in [`DurationAccumulator`] and
//! pause bookkeeping in [`PauseLedger`].

mod duration;
mod engine;
mod model;
mod pause;
mod state;
mod survey;

pub use duration::DurationAccumulator;
pub use engine::{EngineSnapshot, SessionEngine};
pub use model::{CatalogExercise, ExerciseAttempt, Routine, SetRecord, WorkoutSession};
pub use pause::{PauseInterval, PauseLedger, PauseReason};
pub use state::{transition, Operation, SessionStatus};
pub use survey::{CompletionSurvey, Mood, SCALE_MAX, SCALE_MIN};
