//! Upstream record to [`CalendarEvent`] conversion.
//!
//! Each record is validated first; records that fail validation are logged
//! and dropped rather than carried through with missing fields. Valid
//! records map field by field:
//!
//! | canonical   | Google                          | Microsoft                |
//! |-------------|---------------------------------|--------------------------|
//! | title       | `summary`                       | `subject`                |
//! | startTime   | `start.dateTime` / `start.date` | `start.dateTime`         |
//! | endTime     | `end.dateTime` / `end.date`     | `end.dateTime`           |
//! | description | `description`                   | `bodyPreview`            |
//! | location    | `location`                      | `location.displayName`   |
//! | isAllDay    | no `start.dateTime`             | `isAllDay`               |

use dayfocus_core::CalendarEvent;
use tracing::warn;

use crate::schema::{GoogleEvent, GraphEvent, UpstreamPayload};

/// Normalizes every valid record of a payload page, preserving upstream order.
pub fn normalize_payload(payload: UpstreamPayload) -> Vec<CalendarEvent> {
    let provider = payload.provider();

    match payload {
        UpstreamPayload::Google(list) => list
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| match event.validate() {
                Ok(()) => Some(normalize_google_event(event)),
                Err(violation) => {
                    warn!(%provider, id = ?event.id, %violation, "dropping upstream event");
                    None
                }
            })
            .collect(),
        UpstreamPayload::Microsoft(list) => list
            .value
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| match event.validate() {
                Ok(()) => Some(normalize_graph_event(event)),
                Err(violation) => {
                    warn!(%provider, id = ?event.id, %violation, "dropping upstream event");
                    None
                }
            })
            .collect(),
    }
}

/// Maps a validated Google event.
pub fn normalize_google_event(event: GoogleEvent) -> CalendarEvent {
    let start = event.start.unwrap_or_default();
    let end = event.end.unwrap_or_default();

    CalendarEvent::new(
        event.id.unwrap_or_default(),
        start.value().unwrap_or_default(),
    )
    .with_title(event.summary.unwrap_or_default())
    .with_end_time(end.value().unwrap_or_default())
    .with_description(event.description.unwrap_or_default())
    .with_location(event.location.unwrap_or_default())
    .with_all_day(!start.has_time_of_day())
}

/// Maps a validated Microsoft Graph event.
pub fn normalize_graph_event(event: GraphEvent) -> CalendarEvent {
    let start = event.start.and_then(|s| s.date_time).unwrap_or_default();
    let end = event.end.and_then(|e| e.date_time).unwrap_or_default();
    let location = event
        .location
        .and_then(|l| l.display_name)
        .unwrap_or_default();

    CalendarEvent::new(event.id.unwrap_or_default(), start)
        .with_title(event.subject.unwrap_or_default())
        .with_end_time(end)
        .with_description(event.body_preview.unwrap_or_default())
        .with_location(location)
        .with_all_day(event.is_all_day.unwrap_or(false))
}
