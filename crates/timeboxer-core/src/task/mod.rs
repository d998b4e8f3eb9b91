//! Task data model.
//!
//! A [`Task`] is the schedulable unit of work: either created manually by the
//! user or imported from a device calendar event by the reconciler. Its
//! temporal interval is modeled as `Option<Schedule>`, so a task is either
//! fully scheduled (both start and end) or fully unscheduled -- a dangling
//! half-interval is unrepresentable.

pub mod classify;
pub mod scheduling;

pub use classify::{
    classify, completed_count, completion_percent, Classification, TemporalKind, ALL_DAY_MIN_SECS,
};
pub use scheduling::{nearest_half_hour, reschedule, shift_start};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Default display color for manually created tasks.
pub const DEFAULT_COLOR: &str = "#4A90D9";

/// A scheduled time interval. Start and end always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Interval start.
    pub start: DateTime<Utc>,
    /// Interval end.
    pub end: DateTime<Utc>,
}

impl Schedule {
    /// Create a schedule from a start/end pair.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Schedule { start, end }
    }

    /// Interval length in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_seconds()
    }

    /// Whether the interval spans (approximately) a full calendar day.
    ///
    /// The threshold is one second short of 24h to tolerate the 23:59:59
    /// end-of-day convention.
    pub fn is_all_day(&self) -> bool {
        self.duration_secs() >= ALL_DAY_MIN_SECS
    }
}

/// A checklist item owned exclusively by one [`Task`].
///
/// Display order is insertion order; `created_at` keeps that order stable
/// across persistence round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique identifier.
    pub id: Uuid,
    /// Subtask title.
    pub title: String,
    /// Whether the subtask is checked off.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    /// Create a new unchecked subtask.
    pub fn new(title: impl Into<String>) -> Self {
        Subtask {
            id: Uuid::new_v4(),
            title: title.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable unique identifier, assigned at creation and never reassigned.
    pub id: Uuid,
    /// Task title. Must be non-empty to persist.
    pub title: String,
    /// Optional label/tag. For imported tasks this carries the owning
    /// calendar's name.
    pub label: Option<String>,
    /// Opaque display color, carried through unchanged.
    pub color: String,
    /// Important flag. For imported tasks this mirrors the event's alarm.
    pub important: bool,
    /// Scheduled interval, or `None` for an untimed backlog task.
    pub schedule: Option<Schedule>,
    /// Whether the task is completed.
    pub completed: bool,
    /// Checklist items, in insertion order.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Identifier of the calendar event this task was imported from, if any.
    /// Set once by the reconciler and treated as authoritative provenance.
    pub external_event_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new untimed, manually owned task with default values.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            label: None,
            color: DEFAULT_COLOR.to_string(),
            important: false,
            schedule: None,
            completed: false,
            subtasks: Vec::new(),
            external_event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this task was imported from (and is kept in sync with) a
    /// device calendar event.
    pub fn is_imported(&self) -> bool {
        self.external_event_id.is_some()
    }

    /// Check the task is persistable: non-empty title, non-inverted interval.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(schedule) = &self.schedule {
            if schedule.end < schedule.start {
                return Err(ValidationError::InvalidTimeRange {
                    start: schedule.start,
                    end: schedule.end,
                });
            }
        }
        Ok(())
    }

    /// Number of completed subtasks.
    pub fn completed_subtask_count(&self) -> usize {
        completed_count(&self.subtasks)
    }

    /// Subtask completion ratio in `[0.0, 1.0]`; `0.0` when there are none.
    pub fn subtask_completion_percent(&self) -> f64 {
        completion_percent(&self.subtasks)
    }
}
