//! Adherence analytics over past sessions.
//!
//! Only completed sessions count toward completion, streak and weekly
//! frequency metrics. Every record counts toward `total_sessions`.
//!
//! Sessions are bucketed into **active days**: the local calendar date of
//! `ended_at`, falling back to `started_at` then `created_at`. Several
//! sessions on one date collapse into a single active day before any
//! streak is computed.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::history::{HistoryRecord, HistoryStatus, SessionHistory};
use crate::clock::Clock;

/// Aggregate adherence figures. Derived on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdherenceStats {
    /// Every record in the history, whatever its status
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub abandoned_sessions: u32,
    /// Sum of effective seconds over completed sessions
    pub total_effective_seconds: u64,
    /// Completed sessions per week, one decimal
    pub avg_sessions_per_week: f64,
    pub current_streak_days: u32,
    pub best_streak_days: u32,
    /// Distinct dates with at least one completed session
    pub active_days: u32,
}

/// Computes [`AdherenceStats`] with calendar days taken in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct AdherenceAnalyzer {
    offset: FixedOffset,
}

impl Default for AdherenceAnalyzer {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl AdherenceAnalyzer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Analyzer using the system's current local offset.
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Compute stats as of `today`.
    ///
    /// A missing history is the same as an empty one: all zeros.
    pub fn compute(&self, history: Option<&SessionHistory>, today: NaiveDate) -> AdherenceStats {
        let mut stats = AdherenceStats::default();
        let Some(history) = history else {
            return stats;
        };

        for record in history {
            stats.total_sessions += 1;
            match record.status {
                HistoryStatus::Completed => {
                    stats.completed_sessions += 1;
                    stats.total_effective_seconds = stats
                        .total_effective_seconds
                        .saturating_add(record.effective_seconds.unwrap_or(0));
                }
                HistoryStatus::Abandoned => stats.abandoned_sessions += 1,
                HistoryStatus::Unknown => {}
            }
        }

        let days = self.active_days(history);
        stats.active_days = days.len() as u32;
        stats.avg_sessions_per_week = weekly_average(stats.completed_sessions, &days);
        stats.current_streak_days = current_streak(&days, today);
        stats.best_streak_days = best_streak(&days);

        tracing::debug!(
            total = stats.total_sessions,
            completed = stats.completed_sessions,
            active_days = stats.active_days,
            current_streak = stats.current_streak_days,
            best_streak = stats.best_streak_days,
            "adherence computed"
        );
        stats
    }

    /// Compute stats as of the clock's current local date.
    pub fn compute_now(&self, history: Option<&SessionHistory>, clock: &dyn Clock) -> AdherenceStats {
        self.compute(history, self.local_date(clock.now()))
    }

    /// Distinct active days of completed sessions, newest first.
    pub fn active_days(&self, history: &SessionHistory) -> Vec<NaiveDate> {
        let days: BTreeSet<NaiveDate> = history
            .iter()
            .filter(|r| r.is_completed())
            .filter_map(|r| self.activity_date(r))
            .collect();
        days.into_iter().rev().collect()
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    fn activity_date(&self, record: &HistoryRecord) -> Option<NaiveDate> {
        record.activity_time().map(|t| self.local_date(t))
    }
}

/// `completed / max(1, span_in_weeks)`, rounded to one decimal.
fn weekly_average(completed: u32, days_desc: &[NaiveDate]) -> f64 {
    if completed == 0 {
        return 0.0;
    }
    let span_days = match (days_desc.first(), days_desc.last()) {
        (Some(newest), Some(oldest)) => (*newest - *oldest).num_days(),
        _ => 0,
    };
    let weeks = (span_days as f64 / 7.0).max(1.0);
    (f64::from(completed) / weeks * 10.0).round() / 10.0
}

/// Consecutive days ending at today or yesterday.
fn current_streak(days_desc: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut past = days_desc.iter().copied().filter(|d| *d <= today);
    let Some(newest) = past.next() else {
        return 0;
    };
    if (today - newest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut previous = newest;
    for day in past {
        if (previous - day).num_days() != 1 {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}

fn best_streak(days_desc: &[NaiveDate]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days_desc {
        run = match previous {
            Some(p) if (p - day).num_days() == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 20).unwrap()
    }

    fn completed_on(days_ago: i64, hour: u32) -> HistoryRecord {
        let date = today() - Duration::days(days_ago);
        HistoryRecord {
            status: HistoryStatus::Completed,
            ended_at: Some(Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())),
            effective_seconds: Some(1800),
            ..Default::default()
        }
    }

    fn history(days_ago: &[i64]) -> SessionHistory {
        days_ago.iter().map(|d| completed_on(*d, 18)).collect()
    }

    #[test]
    fn test_empty_and_missing_history_are_all_zero() {
        let analyzer = AdherenceAnalyzer::default();
        assert_eq!(analyzer.compute(None, today()), AdherenceStats::default());
        assert_eq!(
            analyzer.compute(Some(&SessionHistory::new()), today()),
            AdherenceStats::default()
        );
    }

    #[test]
    fn test_three_consecutive_days_ending_today() {
        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[0, 1, 2])), today());
        assert_eq!(stats.current_streak_days, 3);
        assert_eq!(stats.best_streak_days, 3);
    }

    #[test]
    fn test_old_streak_is_not_current() {
        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[5, 6, 7])), today());
        assert_eq!(stats.current_streak_days, 0);
        assert_eq!(stats.best_streak_days, 3);
    }

    #[test]
    fn test_gap_splits_streaks() {
        let stats =
            AdherenceAnalyzer::default().compute(Some(&history(&[0, 1, 5, 6, 7])), today());
        assert_eq!(stats.best_streak_days, 3);
        assert_eq!(stats.current_streak_days, 2);
        assert_eq!(stats.avg_sessions_per_week, 5.0);
    }

    #[test]
    fn test_streak_survives_until_end_of_next_day() {
        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[1, 2])), today());
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn test_single_session_today() {
        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[0])), today());
        assert_eq!(stats.avg_sessions_per_week, 1.0);
        assert_eq!(stats.best_streak_days, 1);
        assert_eq!(stats.current_streak_days, 1);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.total_effective_seconds, 1800);
    }

    #[test]
    fn test_same_day_sessions_collapse() {
        let history: SessionHistory = vec![completed_on(0, 7), completed_on(0, 19), completed_on(1, 9)]
            .into_iter()
            .collect();
        let stats = AdherenceAnalyzer::default().compute(Some(&history), today());
        assert_eq!(stats.completed_sessions, 3);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.best_streak_days, 2);
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn test_only_completed_sessions_drive_streaks() {
        let mut history = history(&[0]);
        history.push(HistoryRecord {
            status: HistoryStatus::Abandoned,
            ended_at: completed_on(1, 10).ended_at,
            effective_seconds: Some(400),
            ..Default::default()
        });
        history.push(HistoryRecord::default());

        let stats = AdherenceAnalyzer::default().compute(Some(&history), today());
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.abandoned_sessions, 1);
        assert_eq!(stats.total_effective_seconds, 1800);
        assert_eq!(stats.current_streak_days, 1);
    }

    #[test]
    fn test_missing_duration_counts_as_zero() {
        let mut record = completed_on(0, 12);
        record.effective_seconds = None;
        let history: SessionHistory = vec![record, completed_on(1, 12)].into_iter().collect();
        let stats = AdherenceAnalyzer::default().compute(Some(&history), today());
        assert_eq!(stats.total_effective_seconds, 1800);
    }

    #[test]
    fn test_weekly_average_over_a_long_span() {
        // 4 sessions across 14 days is 2 per week.
        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[0, 4, 9, 14])), today());
        assert_eq!(stats.avg_sessions_per_week, 2.0);

        let stats = AdherenceAnalyzer::default().compute(Some(&history(&[0, 10])), today());
        assert_eq!(stats.avg_sessions_per_week, 1.4);
    }

    #[test]
    fn test_offset_moves_session_to_local_day() {
        // 23:30 UTC on the 19th is already the 20th at UTC+2.
        let late = HistoryRecord {
            status: HistoryStatus::Completed,
            ended_at: Some(Utc.with_ymd_and_hms(2026, 7, 19, 23, 30, 0).unwrap()),
            ..Default::default()
        };
        let history: SessionHistory = vec![late].into_iter().collect();

        let utc = AdherenceAnalyzer::default();
        assert_eq!(utc.active_days(&history), vec![today() - Duration::days(1)]);

        let plus_two = AdherenceAnalyzer::new(FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(plus_two.active_days(&history), vec![today()]);
    }

    #[test]
    fn test_compute_now_uses_clock_date() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 7, 20, 12, 0, 0).unwrap());
        let stats = AdherenceAnalyzer::default().compute_now(Some(&history(&[0, 1])), &clock);
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn test_huge_durations_never_overflow_the_total() {
        let payload = serde_json::json!([
            {"status": "completed", "ended_at": "2026-07-20T07:00:00Z", "duration": "1e30"},
            {"status": "completed", "ended_at": "2026-07-19T07:00:00Z", "effective_seconds": 1800},
        ]);
        let stats = AdherenceAnalyzer::default()
            .compute(Some(&SessionHistory::from_json(&payload)), today());
        assert_eq!(stats.completed_sessions, 2);
        assert_eq!(stats.total_effective_seconds, 1800);

        let near_max = HistoryRecord {
            status: HistoryStatus::Completed,
            effective_seconds: Some(u64::MAX - 10),
            ..Default::default()
        };
        let history: SessionHistory = vec![near_max, completed_on(0, 8)].into_iter().collect();
        let stats = AdherenceAnalyzer::default().compute(Some(&history), today());
        assert_eq!(stats.total_effective_seconds, u64::MAX);
    }

    #[test]
    fn test_undated_completed_session_still_counts() {
        let record = HistoryRecord {
            status: HistoryStatus::Completed,
            effective_seconds: Some(60),
            ..Default::default()
        };
        let history: SessionHistory = vec![record].into_iter().collect();
        let stats = AdherenceAnalyzer::default().compute(Some(&history), today());
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.active_days, 0);
        assert_eq!(stats.best_streak_days, 0);
        assert_eq!(stats.avg_sessions_per_week, 1.0);
    }
}
