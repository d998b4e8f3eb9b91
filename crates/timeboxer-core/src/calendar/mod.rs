//! Device-calendar collaborator surface.
//!
//! The reconciler consumes calendar data read-only through the
//! [`CalendarProvider`] trait; a concrete provider (EventKit bridge, CalDAV
//! client, test double) is injected by the host application. The core never
//! reaches for a process-wide calendar singleton.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A calendar the user can select as an import source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    /// Provider-scoped calendar identifier.
    pub id: String,
    /// Display name. Mapped onto imported tasks' labels.
    pub name: String,
    /// Display color, carried through unchanged.
    pub color: String,
}

/// Calendar access permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarAccess {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access granted; event listings are authoritative.
    Authorized,
    /// Access refused or revoked.
    Denied,
}

/// Half-open query window for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (exclusive).
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Window spanning `past_days` before `now` to `future_days` after.
    pub fn around(now: DateTime<Utc>, past_days: i64, future_days: i64) -> Self {
        DateRange {
            start: now - Duration::days(past_days),
            end: now + Duration::days(future_days),
        }
    }
}

/// A calendar event as exposed by the device calendar. Read-only input to
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEvent {
    /// Provider-assigned event identifier.
    pub external_id: String,
    /// Event title.
    pub title: String,
    /// Owning calendar.
    pub calendar: CalendarRef,
    /// Event start.
    pub start: DateTime<Utc>,
    /// Event end.
    pub end: DateTime<Utc>,
    /// Whether the event is an all-day event.
    pub all_day: bool,
    /// Whether the event carries an alarm.
    pub has_alarm: bool,
}

/// Read-only access to the device calendar.
pub trait CalendarProvider {
    /// Provider-specific failure type.
    type Error: std::fmt::Display;

    /// Current permission state.
    fn access(&self) -> CalendarAccess;

    /// Calendars the user has selected as import sources.
    fn selected_calendars(&self) -> Result<Vec<CalendarRef>, Self::Error>;

    /// Events of the given calendars within the window.
    fn events_in(
        &self,
        calendars: &[CalendarRef],
        range: &DateRange,
    ) -> Result<Vec<ExternalEvent>, Self::Error>;

    /// Look up a single event by its external identifier.
    fn lookup_event(&self, external_id: &str) -> Result<Option<ExternalEvent>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_range_around_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let range = DateRange::around(now, 7, 30);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn access_state_serialization() {
        let json = serde_json::to_string(&CalendarAccess::NotDetermined).unwrap();
        assert_eq!(json, "\"not_determined\"");
        let decoded: CalendarAccess = serde_json::from_str("\"authorized\"").unwrap();
        assert_eq!(decoded, CalendarAccess::Authorized);
    }
}
