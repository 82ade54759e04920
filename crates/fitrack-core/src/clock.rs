//! Clock source and tick handle.
//!
//! Session timing never owns a thread or an OS timer. A [`Ticker`] stores
//! the instant it last credited and, when drained, converts the wall-clock
//! delta since then into whole one-second ticks. The owner decides when to
//! drain, so a cancelled or dropped ticker can never fire again.
//!
//! Tests inject a [`ManualClock`] and advance it explicitly, which lets a
//! thousand seconds of workout run synchronously.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests and simulations.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += delta;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Instance-owned, cancellable one-second tick source.
///
/// Serializable so that a session restored after the process was
/// suspended keeps counting from its last credited instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    mark: Option<DateTime<Utc>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking from `now`.
    ///
    /// Returns `false` without touching the mark when already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.mark.is_some() {
            return false;
        }
        self.mark = Some(now);
        true
    }

    pub fn is_running(&self) -> bool {
        self.mark.is_some()
    }

    /// Stop ticking. Subsequent drains yield nothing.
    pub fn cancel(&mut self) {
        self.mark = None;
    }

    /// Whole seconds elapsed since the last drain.
    ///
    /// Sub-second remainders carry over to the next drain. A clock that
    /// moved backwards re-anchors at `now` and yields zero.
    pub fn drain(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(mark) = self.mark else {
            return 0;
        };
        if now < mark {
            self.mark = Some(now);
            return 0;
        }
        let secs = (now - mark).num_seconds();
        if secs <= 0 {
            return 0;
        }
        self.mark = Some(mark + Duration::seconds(secs));
        secs as u64
    }
}
