//! Microsoft Graph calendar adapter.
//!
//! Reads `me/calendarView` for a window. Graph expands recurring series
//! itself in a calendar view, and continuation pages arrive as absolute
//! `@odata.nextLink` URLs that are followed verbatim.

mod client;

pub use client::{GRAPH_API_BASE, MicrosoftCalendarAdapter};
