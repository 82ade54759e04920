//! Backend selection from configuration.

use fitrack_core::sync::{HistorySource, HttpSyncAdapter, MemoryAdapter, SyncAdapter};
use fitrack_core::Config;

/// The adapter session commands talk to. Offline mode uses an in-process
/// backend that accepts everything.
pub fn sync_adapter(config: &Config) -> Result<Box<dyn SyncAdapter>, Box<dyn std::error::Error>> {
    if config.sync.offline {
        tracing::debug!("offline mode, using in-memory backend");
        return Ok(Box::new(MemoryAdapter::new()));
    }
    Ok(Box::new(HttpSyncAdapter::from_config(&config.sync)?))
}

pub fn history_source(config: &Config) -> Result<impl HistorySource, Box<dyn std::error::Error>> {
    if config.sync.offline {
        return Err("history pull needs a backend; sync.offline is true".into());
    }
    Ok(HttpSyncAdapter::from_config(&config.sync)?)
}
