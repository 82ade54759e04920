//! Elapsed and effective time accounting.
//!
//! One [`Ticker`] drives both counters. Every credited second counts
//! toward `elapsed_seconds`; it also counts toward `effective_seconds`
//! when the status it is credited under is `InProgress`. Time spent
//! paused is excluded from effective time and never credited later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionStatus;
use crate::clock::Ticker;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationAccumulator {
    #[serde(default)]
    elapsed_seconds: u64,
    #[serde(default)]
    effective_seconds: u64,
    #[serde(default)]
    ticker: Ticker,
}

impl DurationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn effective_seconds(&self) -> u64 {
        self.effective_seconds
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Start the ticker. A no-op when it is already running.
    pub fn begin(&mut self, now: DateTime<Utc>) -> bool {
        self.ticker.start(now)
    }

    /// Credit the ticks due at `now` under `status`. Returns the number credited.
    pub fn credit(&mut self, now: DateTime<Utc>, status: SessionStatus) -> u64 {
        if !status.is_live() {
            return 0;
        }
        let ticks = self.ticker.drain(now);
        self.elapsed_seconds += ticks;
        if status == SessionStatus::InProgress {
            self.effective_seconds += ticks;
        }
        ticks
    }

    /// Credit what is due, then cancel the ticker for good.
    pub fn halt(&mut self, now: DateTime<Utc>, status: SessionStatus) -> u64 {
        let ticks = self.credit(now, status);
        self.ticker.cancel();
        ticks
    }
}
