//! SQLite-based local storage.
//!
//! Provides persistent storage for:
//! - The active session snapshot, so a workout survives process restarts
//! - A cache of past session records for offline analytics
//! - Key-value store for application state

use rusqlite::{params, Connection};
use std::path::Path;

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::session::EngineSnapshot;
use crate::stats::{HistoryRecord, SessionHistory};

const ACTIVE_SESSION_KEY: &str = "active_session";

/// SQLite database for local state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/fitrack/fitrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("fitrack.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS history_cache (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                record TEXT NOT NULL
            );",
        )
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn save_active_session(&self, snapshot: &EngineSnapshot) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(snapshot).map_err(|e| DatabaseError::Corrupt {
            key: ACTIVE_SESSION_KEY.into(),
            message: e.to_string(),
        })?;
        self.kv_set(ACTIVE_SESSION_KEY, &json)
    }

    /// The stored snapshot, if any.
    ///
    /// # Errors
    /// A snapshot that no longer decodes is reported as `Corrupt` rather
    /// than silently discarded.
    pub fn load_active_session(&self) -> Result<Option<EngineSnapshot>, DatabaseError> {
        let Some(json) = self.kv_get(ACTIVE_SESSION_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| DatabaseError::Corrupt {
                key: ACTIVE_SESSION_KEY.into(),
                message: e.to_string(),
            })
    }

    pub fn clear_active_session(&self) -> Result<(), DatabaseError> {
        self.kv_delete(ACTIVE_SESSION_KEY)
    }

    /// Replace the cached history in one transaction.
    pub fn replace_history(&mut self, history: &SessionHistory) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM history_cache", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO history_cache (record) VALUES (?1)")?;
            for record in history {
                stmt.execute(params![encode_record(record)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn append_history(&self, record: &HistoryRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO history_cache (record) VALUES (?1)",
            params![encode_record(record)?],
        )?;
        Ok(())
    }

    /// Cached history in insertion order. Rows that are not valid JSON are
    /// kept as default records so counts stay stable.
    pub fn load_history(&self) -> Result<SessionHistory, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM history_cache ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut history = SessionHistory::new();
        for row in rows {
            let text = row?;
            let value = serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "unreadable cached history row");
                serde_json::Value::Null
            });
            history.push(HistoryRecord::from_value(&value));
        }
        Ok(history)
    }
}

fn encode_record(record: &HistoryRecord) -> Result<String, DatabaseError> {
    serde_json::to_string(record).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}
