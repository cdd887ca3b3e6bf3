//! The canonical calendar event.
//!
//! Every provider adapter maps its upstream records into [`CalendarEvent`].
//! After normalization every field is present: absent upstream values become
//! an empty string (or [`UNTITLED`] for the title), never `null`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::parse_event_time;

/// Title used when the upstream record has no (or an empty) title.
pub const UNTITLED: &str = "Untitled";

/// A provider-agnostic calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Provider-native identifier, opaque.
    pub id: String,
    /// Event title, [`UNTITLED`] when absent upstream.
    pub title: String,
    /// ISO-8601 datetime, or a date-only string for all-day events.
    pub start_time: String,
    /// ISO-8601 datetime or date; empty when the upstream record had none.
    pub end_time: String,
    /// Plain-text description, empty when absent.
    pub description: String,
    /// Free-form location, empty when absent.
    pub location: String,
    /// True when the event has no time-of-day component.
    pub is_all_day: bool,
}

impl CalendarEvent {
    /// Creates an event with the given id and start, all other fields defaulted.
    pub fn new(id: impl Into<String>, start_time: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: UNTITLED.to_string(),
            start_time: start_time.into(),
            end_time: String::new(),
            description: String::new(),
            location: String::new(),
            is_all_day: false,
        }
    }

    /// Sets the title; an empty title falls back to [`UNTITLED`].
    ///
    /// Whitespace-only titles are kept as the provider sent them.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };
        self
    }

    pub fn with_end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = end_time.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_all_day(mut self, is_all_day: bool) -> Self {
        self.is_all_day = is_all_day;
        self
    }

    /// Parses `start_time` into an instant.
    ///
    /// Date-only values resolve to midnight UTC. Returns `None` when the
    /// string is not a recognizable date or datetime.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_event_time(&self.start_time)
    }

    /// Parses `end_time` into an instant, `None` when empty or malformed.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_event_time(&self.end_time)
    }

    /// Returns the calendar date of an all-day event.
    pub fn all_day_date(&self) -> Option<NaiveDate> {
        if !self.is_all_day {
            return None;
        }
        NaiveDate::parse_from_str(&self.start_time, "%Y-%m-%d").ok()
    }

    /// Length of the event in whole minutes, when both ends parse.
    pub fn duration_minutes(&self) -> Option<i64> {
        let start = self.starts_at()?;
        let end = self.ends_at()?;
        Some((end - start).num_minutes())
    }
}
