//! Workout session data model and routine catalog input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::duration::DurationAccumulator;
use super::pause::PauseLedger;
use super::state::SessionStatus;
use super::survey::CompletionSurvey;

/// Catalog entry for one exercise, as supplied by the routine service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogExercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub planned_sets: u32,
    #[serde(default)]
    pub planned_reps: u32,
}

/// Read-only routine definition used to seed a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<CatalogExercise>,
}

/// One performed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    /// Load in kilograms; `None` for bodyweight.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub completed: bool,
}

/// Planned work for one exercise plus the sets logged against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAttempt {
    pub exercise_id: String,
    pub name: String,
    pub planned_sets: u32,
    pub planned_reps: u32,
    #[serde(default)]
    pub sets: Vec<SetRecord>,
}

impl From<&CatalogExercise> for ExerciseAttempt {
    fn from(exercise: &CatalogExercise) -> Self {
        Self {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            planned_sets: exercise.planned_sets,
            planned_reps: exercise.planned_reps,
            sets: Vec::new(),
        }
    }
}

impl ExerciseAttempt {
    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }
}

/// One attempt at a routine.
///
/// Only [`SessionEngine`](super::SessionEngine) mutates a session; callers
/// receive it by shared reference for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    /// Local identity, assigned at construction.
    pub local_id: Uuid,
    /// Remote identity, present once the backend confirmed creation.
    #[serde(default)]
    pub id: Option<String>,
    pub routine_id: String,
    pub routine_name: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub(crate) durations: DurationAccumulator,
    #[serde(default)]
    pub(crate) pauses: PauseLedger,
    #[serde(default)]
    pub exercises: Vec<ExerciseAttempt>,
    #[serde(default)]
    pub survey: Option<CompletionSurvey>,
    /// True while a terminal notification is still waiting for the backend.
    #[serde(default)]
    pub sync_pending: bool,
}

impl WorkoutSession {
    pub fn from_routine(routine: &Routine) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            id: None,
            routine_id: routine.id.clone(),
            routine_name: routine.name.clone(),
            status: SessionStatus::NotStarted,
            started_at: None,
            ended_at: None,
            durations: DurationAccumulator::new(),
            pauses: PauseLedger::new(),
            exercises: routine.exercises.iter().map(ExerciseAttempt::from).collect(),
            survey: None,
            sync_pending: false,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.durations.elapsed_seconds()
    }

    pub fn effective_seconds(&self) -> u64 {
        self.durations.effective_seconds()
    }

    pub fn pauses(&self) -> &PauseLedger {
        &self.pauses
    }

    pub fn is_ticking(&self) -> bool {
        self.durations.is_ticking()
    }
}
