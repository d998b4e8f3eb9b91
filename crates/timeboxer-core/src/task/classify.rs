//! Temporal classification of tasks.
//!
//! Pure, total functions over a task snapshot: temporal kind
//! (untimed / all-day / timeboxed), ongoing/overdue status against a caller
//! supplied `now`, and subtask completion aggregates. No side effects, no
//! I/O; callers decide how to propagate the returned snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Subtask, Task};

/// Minimum interval length, in seconds, for a schedule to count as all-day.
/// One second short of 24h, tolerating a 23:59:59 end-of-day convention.
pub const ALL_DAY_MIN_SECS: i64 = 86_399;

/// A task's temporal kind. Exactly one kind holds for any task.
///
/// Kind only changes through explicit user rescheduling
/// ([`reschedule`](super::reschedule)) or reconciler import mapping; a task
/// never changes kind spontaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    /// No start/end interval (backlog item).
    Untimed,
    /// Scheduled interval spanning (approximately) a full calendar day.
    AllDay,
    /// Scheduled to a fixed sub-day start/end interval.
    Timeboxed,
}

impl Task {
    /// True iff the task carries a start/end interval.
    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }

    /// True iff the task is scheduled and its interval meets the all-day
    /// threshold. Always false for unscheduled tasks.
    pub fn is_all_day(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| s.is_all_day())
    }

    /// True iff the task is scheduled to a sub-day interval.
    pub fn is_timeboxed(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| !s.is_all_day())
    }

    /// The task's temporal kind.
    pub fn temporal_kind(&self) -> TemporalKind {
        match &self.schedule {
            None => TemporalKind::Untimed,
            Some(s) if s.is_all_day() => TemporalKind::AllDay,
            Some(_) => TemporalKind::Timeboxed,
        }
    }

    /// True iff `now` falls within the scheduled interval (`start <= now < end`).
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.schedule
            .as_ref()
            .is_some_and(|s| s.start <= now && now < s.end)
    }

    /// True iff the scheduled interval ended before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.schedule.as_ref().is_some_and(|s| s.end < now)
    }
}

/// Count of completed subtasks.
pub fn completed_count(subtasks: &[Subtask]) -> usize {
    subtasks.iter().filter(|s| s.completed).count()
}

/// Subtask completion ratio in `[0.0, 1.0]`.
///
/// Defined as exactly `0.0` for an empty list; never NaN.
pub fn completion_percent(subtasks: &[Subtask]) -> f64 {
    if subtasks.is_empty() {
        0.0
    } else {
        completed_count(subtasks) as f64 / subtasks.len() as f64
    }
}

/// One classification snapshot of a task at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Temporal kind.
    pub kind: TemporalKind,
    /// Whether `now` falls within the scheduled interval.
    pub is_ongoing: bool,
    /// Whether the scheduled interval has already ended.
    pub is_overdue: bool,
    /// Subtask completion ratio.
    pub completion_percent: f64,
}

/// Classify a task at `now`. Pure; the caller decides how to propagate it.
pub fn classify(task: &Task, now: DateTime<Utc>) -> Classification {
    Classification {
        kind: task.temporal_kind(),
        is_ongoing: task.is_ongoing(now),
        is_overdue: task.is_overdue(now),
        completion_percent: completion_percent(&task.subtasks),
    }
}
