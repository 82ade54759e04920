use clap::Subcommand;
use fitrack_core::{Config, Database, HistoryRecord, HistorySource};

use crate::backend;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Fetch past sessions from the backend into the local cache.
    /// A finished workout the backend has not heard of yet is kept.
    Pull,
    /// Print the cached history as JSON
    Show,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        HistoryAction::Pull => {
            let config = Config::load()?;
            let source = backend::history_source(&config)?;
            let mut history = source.fetch_history()?;
            let pulled = history.len();
            let mut db = Database::open()?;
            if let Some(record) = unsynced_record(&db)? {
                if !history.iter().any(|r| r.id == record.id) {
                    history.push(record);
                }
            }
            db.replace_history(&history)?;
            println!("pulled {pulled} sessions");
        }
        HistoryAction::Show => {
            let db = Database::open()?;
            let history = db.load_history()?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}

/// The stored terminal session whose notification is still queued, if any.
fn unsynced_record(db: &Database) -> Result<Option<HistoryRecord>, Box<dyn std::error::Error>> {
    let record = db
        .load_active_session()?
        .filter(|s| s.session.status.is_terminal() && !s.outbox.is_empty())
        .map(|s| HistoryRecord::from(&s.session));
    Ok(record)
}
