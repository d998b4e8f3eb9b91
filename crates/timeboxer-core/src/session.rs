//! Focus session records and scoring.
//!
//! A [`TaskSession`] is an immutable record of one completed focus run.
//! Records are only ever created and aggregated, never mutated. Points are
//! computed once, at record time, by an explicit [`ScorePolicy`] so the
//! formula lives in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the focus run was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    /// Counting down a planned duration.
    Countdown,
    /// Open-ended stopwatch run.
    Stopwatch,
}

/// Point-awarding policy for completed sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// Points per fully focused minute.
    pub points_per_minute: u32,
    /// Bonus for a countdown run that reaches its planned duration.
    pub completion_bonus: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        ScorePolicy {
            points_per_minute: 1,
            completion_bonus: 10,
        }
    }
}

impl ScorePolicy {
    /// Points for a run of `focused_secs`, against an optional planned
    /// duration. Stopwatch runs never earn the completion bonus.
    pub fn score(&self, focused_secs: u32, planned_secs: Option<u32>, mode: FocusMode) -> u32 {
        let base = (focused_secs / 60) * self.points_per_minute;
        let bonus = match (mode, planned_secs) {
            (FocusMode::Countdown, Some(planned)) if focused_secs >= planned => {
                self.completion_bonus
            }
            _ => 0,
        };
        base + bonus
    }
}

/// Immutable record of one completed focus run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSession {
    /// Unique identifier.
    pub id: Uuid,
    /// Task the run was performed against. Nulled if the task is later
    /// deleted; the session survives for analytics.
    pub task_id: Option<Uuid>,
    /// Focus mode of the run.
    pub mode: FocusMode,
    /// Focused duration in whole seconds.
    pub focused_secs: u32,
    /// Points awarded at record time.
    pub points: u32,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
}

impl TaskSession {
    /// Record a completed run, scoring it under `policy`.
    pub fn record(
        task_id: Option<Uuid>,
        mode: FocusMode,
        focused_secs: u32,
        planned_secs: Option<u32>,
        policy: &ScorePolicy,
        completed_at: DateTime<Utc>,
    ) -> Self {
        TaskSession {
            id: Uuid::new_v4(),
            task_id,
            mode,
            focused_secs,
            points: policy.score(focused_secs, planned_secs, mode),
            completed_at,
        }
    }

    /// Focused duration in whole minutes.
    pub fn focused_minutes(&self) -> u32 {
        self.focused_secs / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_policy_awards_one_point_per_minute() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.score(25 * 60, None, FocusMode::Stopwatch), 25);
        assert_eq!(policy.score(59, None, FocusMode::Stopwatch), 0);
        assert_eq!(policy.score(0, None, FocusMode::Stopwatch), 0);
    }

    #[test]
    fn completed_countdown_earns_the_bonus() {
        let policy = ScorePolicy::default();
        let planned = 25 * 60;
        assert_eq!(policy.score(planned, Some(planned), FocusMode::Countdown), 35);
        // Stopped early: base only
        assert_eq!(policy.score(20 * 60, Some(planned), FocusMode::Countdown), 20);
    }

    #[test]
    fn stopwatch_never_earns_the_bonus() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.score(30 * 60, Some(25 * 60), FocusMode::Stopwatch), 30);
    }

    #[test]
    fn record_scores_at_creation_time() {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap();
        let session = TaskSession::record(
            None,
            FocusMode::Countdown,
            25 * 60,
            Some(25 * 60),
            &ScorePolicy::default(),
            at,
        );
        assert_eq!(session.points, 35);
        assert_eq!(session.focused_minutes(), 25);
        assert_eq!(session.completed_at, at);
        assert!(session.task_id.is_none());
    }

    #[test]
    fn custom_policy_scales_points() {
        let policy = ScorePolicy {
            points_per_minute: 2,
            completion_bonus: 0,
        };
        assert_eq!(policy.score(25 * 60, Some(25 * 60), FocusMode::Countdown), 50);
    }
}
