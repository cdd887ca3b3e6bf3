//! Google Calendar adapter.
//!
//! Reads `events.list` of the primary calendar with `singleEvents=true`
//! so recurring events arrive as individual occurrences ordered by start.
//!
//! # Example
//!
//! ```ignore
//! use dayfocus_providers::{CalendarProvider, google::GoogleCalendarAdapter};
//!
//! let adapter = GoogleCalendarAdapter::new(Duration::from_secs(30))?;
//! let events = adapter.list_today_events(&access_token).await?;
//! ```

mod client;

pub use client::{CALENDAR_API_BASE, GoogleCalendarAdapter};
