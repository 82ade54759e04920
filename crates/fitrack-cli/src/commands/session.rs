use clap::Subcommand;
use fitrack_core::session::{EngineSnapshot, SessionEngine};
use fitrack_core::sync::SyncAdapter;
use fitrack_core::{
    CompletionSurvey, Config, Database, HistoryRecord, Mood, PauseReason, Routine, SessionEvent,
    SetRecord, SystemClock,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backend;

type Engine = SessionEngine<Box<dyn SyncAdapter>>;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a workout from a routine definition
    Start {
        /// Routine JSON file ({"id", "name", "exercises": [...]})
        #[arg(long)]
        routine: PathBuf,
    },
    /// Pause the running workout
    Pause {
        /// rest, equipment, hydration, pain, interruption, or free text
        #[arg(long)]
        reason: String,
    },
    /// Resume a paused workout
    Resume,
    /// Log a performed set
    Set {
        /// Exercise position in the routine, starting at 0
        #[arg(long)]
        exercise: usize,
        #[arg(long)]
        reps: u32,
        /// Load in kg; omit for bodyweight
        #[arg(long)]
        weight: Option<f64>,
        /// Replace an already logged set instead of appending
        #[arg(long)]
        replace: Option<usize>,
        /// Mark the set as not completed
        #[arg(long)]
        failed: bool,
    },
    /// Finish the workout with a short survey
    Complete {
        /// Perceived intensity, 1-10
        #[arg(long)]
        intensity: u8,
        /// Energy level, 1-10
        #[arg(long)]
        energy: u8,
        /// great, good, okay, low, bad
        #[arg(long)]
        mood: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Give up on the workout
    Abandon,
    /// Print the current session as JSON
    Status,
    /// Retry notifications that did not reach the backend
    Retry,
}

fn restore(snapshot: EngineSnapshot, config: &Config) -> Result<Engine, Box<dyn std::error::Error>> {
    let adapter = backend::sync_adapter(config)?;
    let mut engine = SessionEngine::restore(
        snapshot,
        adapter,
        Arc::new(SystemClock),
        config.retry_policy(),
    );
    engine.resume_ticking();
    engine.tick();
    Ok(engine)
}

fn load_active(db: &Database, config: &Config) -> Result<Engine, Box<dyn std::error::Error>> {
    let snapshot = db
        .load_active_session()?
        .ok_or("no active workout; start one with `session start`")?;
    restore(snapshot, config)
}

/// Persist after a command. A terminal session is kept only until its
/// outbox drains.
fn persist(db: &Database, engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    if engine.status().is_terminal() && engine.outbox().is_empty() {
        db.clear_active_session()?;
    } else {
        db.save_active_session(&engine.snapshot())?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Save the local change, then try to deliver queued notifications and
/// save again. The local state is on disk before any network call.
fn commit(
    db: &Database,
    engine: &mut Engine,
    event: SessionEvent,
) -> Result<(), Box<dyn std::error::Error>> {
    persist(db, engine)?;
    let delivery = engine.retry_pending();
    persist(db, engine)?;
    print_json(&json!({ "event": event, "delivery": delivery }))
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    match action {
        SessionAction::Start { routine } => {
            if let Some(existing) = db.load_active_session()? {
                if !existing.session.status.is_terminal() {
                    return Err("a workout is already in progress".into());
                }
                if !existing.outbox.is_empty() {
                    return Err(
                        "previous workout has unsynced changes; run `session retry` first".into(),
                    );
                }
            }
            let text = std::fs::read_to_string(&routine)
                .map_err(|e| format!("cannot read {}: {e}", routine.display()))?;
            let routine: Routine = serde_json::from_str(&text)?;

            let mut engine = SessionEngine::new(
                &routine,
                backend::sync_adapter(&config)?,
                Arc::new(SystemClock),
                config.retry_policy(),
            );
            let event = engine.start()?;
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Pause { reason } => {
            let mut engine = load_active(&db, &config)?;
            let event = engine.pause(PauseReason::parse(&reason)?)?;
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Resume => {
            let mut engine = load_active(&db, &config)?;
            let event = engine.resume()?;
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Set {
            exercise,
            reps,
            weight,
            replace,
            failed,
        } => {
            let mut engine = load_active(&db, &config)?;
            let set = SetRecord {
                weight,
                reps,
                completed: !failed,
            };
            let event = match replace {
                Some(index) => engine.update_set(exercise, index, set)?,
                None => engine.record_set(exercise, set)?,
            };
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Complete {
            intensity,
            energy,
            mood,
            notes,
        } => {
            let mut engine = load_active(&db, &config)?;
            let survey = CompletionSurvey::new(intensity, energy, Mood::parse(&mood)?, notes)?;
            let event = engine.complete(survey)?;
            db.append_history(&HistoryRecord::from(engine.session()))?;
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Abandon => {
            let mut engine = load_active(&db, &config)?;
            let event = engine.abandon()?;
            db.append_history(&HistoryRecord::from(engine.session()))?;
            commit(&db, &mut engine, event)?;
        }
        SessionAction::Status => {
            let engine = load_active(&db, &config)?;
            persist(&db, &engine)?;
            print_json(&json!({
                "session": engine.session(),
                "queued_notifications": engine.outbox().len(),
                "next_retry_in_secs": engine.next_retry_in().map(|d| d.num_seconds()),
            }))?;
        }
        SessionAction::Retry => {
            let mut engine = load_active(&db, &config)?;
            let report = engine.retry_pending();
            persist(&db, &engine)?;
            print_json(&report)?;
        }
    }
    Ok(())
}
