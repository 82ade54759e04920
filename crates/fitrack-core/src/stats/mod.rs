//! Session history and adherence analytics.
//!
//! History arrives from the backend or the local cache and is parsed
//! leniently. The analyzer works on an immutable history and holds no
//! state of its own.

mod adherence;
mod history;

pub use adherence::{AdherenceAnalyzer, AdherenceStats};
pub use history::{HistoryRecord, HistoryStatus, SessionHistory};
