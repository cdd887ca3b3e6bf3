//! Time helpers for event queries.
//!
//! [`TimeWindow`] defines the query range sent to providers, and
//! [`parse_event_time`] turns the string times carried by
//! [`CalendarEvent`](crate::CalendarEvent) back into instants.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time window for querying calendar events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window.
    pub start: DateTime<Utc>,
    /// End of the window.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Window from `now` until the last millisecond of the local day
    /// (23:59:59.999 in `tz`).
    pub fn today_remaining<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let last_instant = today.and_time(end_of_day_time());

        let end = match tz.from_local_datetime(&last_instant) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(_, latest) => latest.with_timezone(&Utc),
            // 23:59 inside a DST gap; fall back to the naive instant read as UTC.
            LocalResult::None => last_instant.and_utc(),
        };

        Self {
            start: now,
            end: end.max(now),
        }
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window (both ends inclusive).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }
}

fn end_of_day_time() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Parses a provider time string.
///
/// Accepts RFC 3339 datetimes, offset-less datetimes (read as UTC, the form
/// Microsoft Graph returns) and date-only values (midnight UTC).
pub fn parse_event_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn today_remaining_in_utc() {
        let now = utc(2025, 2, 5, 14, 30, 0);
        let window = TimeWindow::today_remaining(now, &Utc);

        assert_eq!(window.start, now);
        assert_eq!(window.end.date_naive(), now.date_naive());
        assert_eq!(window.end.hour(), 23);
        assert_eq!(window.end.minute(), 59);
        assert_eq!(window.end.second(), 59);
        assert_eq!(window.end.timestamp_subsec_millis(), 999);
    }

    #[test]
    fn today_remaining_uses_local_day() {
        // 23:00 UTC is already the next day at UTC+2.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = utc(2025, 2, 5, 23, 0, 0);
        let window = TimeWindow::today_remaining(now, &tz);

        // End of 2025-02-06 local is 21:59:59.999 UTC on the 6th.
        assert_eq!(window.end.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 6).unwrap());
        assert_eq!(window.end.hour(), 21);
        assert!(window.contains(now));
    }

    #[test]
    fn contains_is_inclusive() {
        let window = TimeWindow::new(utc(2025, 2, 5, 10, 0, 0), utc(2025, 2, 5, 12, 0, 0));
        assert!(window.contains(utc(2025, 2, 5, 10, 0, 0)));
        assert!(window.contains(utc(2025, 2, 5, 12, 0, 0)));
        assert!(!window.contains(utc(2025, 2, 5, 12, 0, 1)));
        assert_eq!(window.duration(), Duration::hours(2));
    }

    #[test]
    #[should_panic(expected = "TimeWindow start must be <= end")]
    fn inverted_window_panics() {
        TimeWindow::new(utc(2025, 2, 5, 12, 0, 0), utc(2025, 2, 5, 10, 0, 0));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_event_time("2024-03-15T10:00:00+02:00").unwrap();
        assert_eq!(parsed, utc(2024, 3, 15, 8, 0, 0));
    }

    #[test]
    fn parses_graph_datetime_without_offset() {
        let parsed = parse_event_time("2024-03-15T10:00:00.0000000").unwrap();
        assert_eq!(parsed, utc(2024, 3, 15, 10, 0, 0));
    }

    #[test]
    fn parses_date_only() {
        let parsed = parse_event_time("2024-01-01").unwrap();
        assert_eq!(parsed, utc(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(parse_event_time("").is_none());
        assert!(parse_event_time("tomorrow").is_none());
    }
}
