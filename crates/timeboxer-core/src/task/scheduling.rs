//! Schedule defaults for temporal-kind transitions and start-drag edits.
//!
//! When the user switches a task between untimed, all-day and timeboxed, or
//! drags a timeboxed task's start, the new interval is computed here. All
//! functions are pure over the prior schedule and a caller-supplied `now`.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use super::classify::ALL_DAY_MIN_SECS;
use super::{Schedule, TemporalKind};

/// Default length of a freshly timeboxed interval.
const DEFAULT_TIMEBOX_SECS: i64 = 3_600;

/// Half-hour grid used when proposing a fresh timeboxed start.
const HALF_HOUR_SECS: i64 = 1_800;

/// Midnight of the instant's calendar day.
pub(crate) fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 23:59:59 of the instant's calendar day.
pub(crate) fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + Duration::seconds(ALL_DAY_MIN_SECS)
}

/// Round an instant to the nearest half-hour boundary.
///
/// 10:10 rounds down to 10:00, 10:20 rounds up to 10:30; the exact midpoint
/// (xx:15, xx:45) rounds up.
pub fn nearest_half_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let ts = t.timestamp();
    let rem = ts.rem_euclid(HALF_HOUR_SECS);
    let rounded = if rem < HALF_HOUR_SECS / 2 {
        ts - rem
    } else {
        ts - rem + HALF_HOUR_SECS
    };
    DateTime::from_timestamp(rounded, 0).unwrap_or(t)
}

/// Compute the schedule for a transition to `kind`.
///
/// - `Untimed`: the interval is cleared.
/// - `AllDay`: midnight .. 23:59:59 of the reference day -- the prior start's
///   day when a schedule existed, otherwise today.
/// - `Timeboxed`: an existing timeboxed interval is retained; coming from
///   untimed or all-day, a fresh one-hour interval starts at the nearest
///   half-hour to `now`.
pub fn reschedule(
    prior: Option<&Schedule>,
    kind: TemporalKind,
    now: DateTime<Utc>,
) -> Option<Schedule> {
    match kind {
        TemporalKind::Untimed => None,
        TemporalKind::AllDay => {
            let reference = prior.map(|s| s.start).unwrap_or(now);
            Some(Schedule::new(
                start_of_day(reference),
                end_of_day(reference),
            ))
        }
        TemporalKind::Timeboxed => match prior {
            Some(s) if !s.is_all_day() => Some(s.clone()),
            _ => {
                let start = nearest_half_hour(now);
                Some(Schedule::new(start, start + Duration::seconds(DEFAULT_TIMEBOX_SECS)))
            }
        },
    }
}

/// Move a timeboxed interval to a new start, preserving its duration.
///
/// The end is shifted by the signed start delta, so the edit commutes: moving
/// the start later and then back earlier restores the original interval, and
/// a start dragged past the old end still yields a well-formed interval of
/// the same length.
pub fn shift_start(prior: &Schedule, new_start: DateTime<Utc>) -> Schedule {
    let delta = new_start.signed_duration_since(prior.start);
    Schedule::new(new_start, prior.end + delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, m, s).unwrap()
    }

    #[test]
    fn nearest_half_hour_rounds_down_before_midpoint() {
        assert_eq!(nearest_half_hour(at(10, 10, 0)), at(10, 0, 0));
        assert_eq!(nearest_half_hour(at(10, 44, 59)), at(10, 30, 0));
    }

    #[test]
    fn nearest_half_hour_rounds_up_from_midpoint() {
        assert_eq!(nearest_half_hour(at(10, 15, 0)), at(10, 30, 0));
        assert_eq!(nearest_half_hour(at(10, 50, 0)), at(11, 0, 0));
    }

    #[test]
    fn nearest_half_hour_keeps_exact_boundary() {
        assert_eq!(nearest_half_hour(at(10, 30, 0)), at(10, 30, 0));
        assert_eq!(nearest_half_hour(at(10, 0, 0)), at(10, 0, 0));
    }

    #[test]
    fn to_untimed_clears_interval() {
        let prior = Schedule::new(at(9, 0, 0), at(10, 0, 0));
        assert_eq!(reschedule(Some(&prior), TemporalKind::Untimed, at(12, 0, 0)), None);
        assert_eq!(reschedule(None, TemporalKind::Untimed, at(12, 0, 0)), None);
    }

    #[test]
    fn to_all_day_without_prior_uses_today() {
        let schedule = reschedule(None, TemporalKind::AllDay, at(14, 23, 7)).unwrap();
        assert_eq!(schedule.start, at(0, 0, 0));
        assert_eq!(schedule.end, at(23, 59, 59));
        assert!(schedule.is_all_day());
    }

    #[test]
    fn to_all_day_with_prior_uses_prior_start_day() {
        let prior_day = Utc.with_ymd_and_hms(2024, 6, 3, 16, 0, 0).unwrap();
        let prior = Schedule::new(prior_day, prior_day + Duration::hours(1));
        let schedule = reschedule(Some(&prior), TemporalKind::AllDay, at(9, 0, 0)).unwrap();
        assert_eq!(schedule.start, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        assert_eq!(schedule.end, Utc.with_ymd_and_hms(2024, 6, 3, 23, 59, 59).unwrap());
    }

    #[test]
    fn to_timeboxed_without_prior_snaps_to_half_hour() {
        let schedule = reschedule(None, TemporalKind::Timeboxed, at(10, 20, 0)).unwrap();
        assert_eq!(schedule.start, at(10, 30, 0));
        assert_eq!(schedule.end, at(11, 30, 0));
    }

    #[test]
    fn to_timeboxed_retains_existing_timebox() {
        let prior = Schedule::new(at(9, 0, 0), at(9, 45, 0));
        let schedule = reschedule(Some(&prior), TemporalKind::Timeboxed, at(13, 0, 0)).unwrap();
        assert_eq!(schedule, prior);
    }

    #[test]
    fn to_timeboxed_from_all_day_starts_fresh() {
        let prior = Schedule::new(at(0, 0, 0), at(23, 59, 59));
        let schedule = reschedule(Some(&prior), TemporalKind::Timeboxed, at(10, 5, 0)).unwrap();
        assert_eq!(schedule.start, at(10, 0, 0));
        assert_eq!(schedule.end, at(11, 0, 0));
    }

    #[test]
    fn shift_start_preserves_duration() {
        let prior = Schedule::new(at(9, 0, 0), at(10, 30, 0));
        let shifted = shift_start(&prior, at(11, 0, 0));
        assert_eq!(shifted.start, at(11, 0, 0));
        assert_eq!(shifted.end, at(12, 30, 0));
        assert_eq!(shifted.duration_secs(), prior.duration_secs());
    }

    #[test]
    fn shift_start_past_old_end_stays_well_formed() {
        let prior = Schedule::new(at(9, 0, 0), at(9, 30, 0));
        // New start on/after the old end
        let shifted = shift_start(&prior, at(10, 0, 0));
        assert_eq!(shifted.start, at(10, 0, 0));
        assert_eq!(shifted.end, at(10, 30, 0));
        assert!(shifted.end > shifted.start);
    }

    #[test]
    fn shift_start_commutes() {
        let prior = Schedule::new(at(9, 0, 0), at(10, 0, 0));
        let forward_then_back = shift_start(&shift_start(&prior, at(13, 0, 0)), at(9, 0, 0));
        assert_eq!(forward_then_back, prior);

        let back_then_forward = shift_start(&shift_start(&prior, at(7, 0, 0)), at(9, 0, 0));
        assert_eq!(back_then_forward, prior);
    }
}
