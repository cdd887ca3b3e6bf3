//! Current/next event selection for the dashboard.
//!
//! The dashboard shows at most two events: the one happening right now and
//! the one after it. All-day events are kept in the day's list but are never
//! picked as current or next.

use chrono::{DateTime, Utc};

use crate::event::CalendarEvent;

/// A day's events ordered by start time, evaluated against a clock reading.
#[derive(Debug, Clone, Default)]
pub struct Agenda {
    events: Vec<CalendarEvent>,
}

impl Agenda {
    /// Builds an agenda, sorting timed events by start.
    ///
    /// Events whose start cannot be parsed keep their relative position at
    /// the end of the list.
    pub fn new(mut events: Vec<CalendarEvent>) -> Self {
        events.sort_by_key(|event| (event.starts_at().is_none(), event.starts_at()));
        Self { events }
    }

    /// All events, in display order.
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The first timed event running at `now` (`start <= now < end`).
    pub fn current(&self, now: DateTime<Utc>) -> Option<&CalendarEvent> {
        self.timed().find(|event| match (event.starts_at(), event.ends_at()) {
            (Some(start), Some(end)) => start <= now && now < end,
            _ => false,
        })
    }

    /// The first timed event starting after the current one, or after `now`
    /// when nothing is running.
    pub fn next(&self, now: DateTime<Utc>) -> Option<&CalendarEvent> {
        let after = self
            .current(now)
            .and_then(CalendarEvent::starts_at)
            .unwrap_or(now);

        self.timed()
            .find(|event| event.starts_at().is_some_and(|start| start > after))
    }

    fn timed(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.iter().filter(|event| !event.is_all_day)
    }
}
