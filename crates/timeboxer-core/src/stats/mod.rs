//! Productivity analytics over session and task snapshots.
//!
//! Pure aggregation: callers pass slices of [`TaskSession`] records and
//! [`Task`]s, and get back bucketed totals. No storage coupling; the store
//! only needs to hand over the rows.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::TaskSession;
use crate::task::Task;

/// Aggregated focus totals for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTotals {
    /// Number of sessions in the bucket.
    pub sessions: u64,
    /// Total focused seconds.
    pub focused_secs: u64,
    /// Total points awarded.
    pub points: u64,
}

impl FocusTotals {
    /// Total focused whole minutes.
    pub fn focused_minutes(&self) -> u64 {
        self.focused_secs / 60
    }
}

fn totals<'a>(sessions: impl Iterator<Item = &'a TaskSession>) -> FocusTotals {
    let mut acc = FocusTotals::default();
    for session in sessions {
        acc.sessions += 1;
        acc.focused_secs += u64::from(session.focused_secs);
        acc.points += u64::from(session.points);
    }
    acc
}

/// Totals for sessions completed on the given calendar day.
pub fn daily_totals(sessions: &[TaskSession], day: NaiveDate) -> FocusTotals {
    totals(
        sessions
            .iter()
            .filter(|s| s.completed_at.date_naive() == day),
    )
}

/// Totals for sessions completed in the ISO week containing `week_of`.
pub fn weekly_totals(sessions: &[TaskSession], week_of: NaiveDate) -> FocusTotals {
    let week = week_of.iso_week();
    totals(
        sessions
            .iter()
            .filter(|s| s.completed_at.date_naive().iso_week() == week),
    )
}

/// Totals for sessions completed in the given calendar month.
pub fn monthly_totals(sessions: &[TaskSession], year: i32, month: u32) -> FocusTotals {
    totals(sessions.iter().filter(|s| {
        let day = s.completed_at.date_naive();
        day.year() == year && day.month() == month
    }))
}

/// Fraction of completed tasks in `[0.0, 1.0]`; `0.0` for an empty slice.
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        0.0
    } else {
        tasks.iter().filter(|t| t.completed).count() as f64 / tasks.len() as f64
    }
}
