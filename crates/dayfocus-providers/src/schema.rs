//! Upstream response schemas.
//!
//! Each provider's event-list body is parsed into its own typed schema and
//! wrapped in [`UpstreamPayload`]. A body that does not deserialize fails the
//! whole fetch; individual records are checked with `validate()` before they
//! are mapped to the canonical model (see [`crate::normalize`]).

use dayfocus_core::Provider;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{ProviderError, ProviderResult};

/// A parsed event-list page from one of the known providers.
#[derive(Debug, Clone)]
pub enum UpstreamPayload {
    Google(GoogleEventList),
    Microsoft(GraphEventList),
}

impl UpstreamPayload {
    /// Parses a response body using the schema of `provider`.
    pub fn parse(provider: Provider, body: &str) -> ProviderResult<Self> {
        let parsed = match provider {
            Provider::Google => serde_json::from_str(body).map(Self::Google),
            Provider::Microsoft => serde_json::from_str(body).map(Self::Microsoft),
        };

        parsed.map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider(provider)
                .with_source(e)
        })
    }

    /// The provider whose schema this payload follows.
    pub fn provider(&self) -> Provider {
        match self {
            Self::Google(_) => Provider::Google,
            Self::Microsoft(_) => Provider::Microsoft,
        }
    }

    /// Continuation marker: Google's page token or Graph's next link.
    pub fn next_page(&self) -> Option<&str> {
        let marker = match self {
            Self::Google(list) => list.next_page_token.as_deref(),
            Self::Microsoft(list) => list.next_link.as_deref(),
        };
        non_empty(marker)
    }

    /// Number of records on this page, valid or not.
    pub fn len(&self) -> usize {
        match self {
            Self::Google(list) => list.items.as_ref().map_or(0, Vec::len),
            Self::Microsoft(list) => list.value.as_ref().map_or(0, Vec::len),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why an upstream record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("record has no id")]
    MissingId,
    #[error("record has no start time")]
    MissingStart,
}

// ---------------------------------------------------------------------------
// Google Calendar v3 `events.list`
// ---------------------------------------------------------------------------

/// Body of `GET /calendars/{id}/events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventList {
    pub items: Option<Vec<GoogleEvent>>,
    pub next_page_token: Option<String>,
}

/// A single Google event resource (only the fields we map).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
}

/// Either `dateTime` (timed) or `date` (all-day) is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

impl GoogleEventTime {
    /// `dateTime` when present, otherwise `date`.
    pub fn value(&self) -> Option<&str> {
        non_empty(self.date_time.as_deref()).or_else(|| non_empty(self.date.as_deref()))
    }

    pub fn has_time_of_day(&self) -> bool {
        non_empty(self.date_time.as_deref()).is_some()
    }
}

impl GoogleEvent {
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if non_empty(self.id.as_deref()).is_none() {
            return Err(SchemaViolation::MissingId);
        }
        if self.start.as_ref().and_then(GoogleEventTime::value).is_none() {
            return Err(SchemaViolation::MissingStart);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Microsoft Graph v1.0 `me/calendarView`
// ---------------------------------------------------------------------------

/// Body of `GET /me/calendarView`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphEventList {
    pub value: Option<Vec<GraphEvent>>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// A single Graph event resource (only the fields we map).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEvent {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub start: Option<GraphDateTime>,
    pub end: Option<GraphDateTime>,
    pub location: Option<GraphLocation>,
    pub is_all_day: Option<bool>,
}

/// Graph `dateTimeTimeZone`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLocation {
    pub display_name: Option<String>,
}

impl GraphEvent {
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if non_empty(self.id.as_deref()).is_none() {
            return Err(SchemaViolation::MissingId);
        }
        let start = self
            .start
            .as_ref()
            .and_then(|s| non_empty(s.date_time.as_deref()));
        if start.is_none() {
            return Err(SchemaViolation::MissingStart);
        }
        Ok(())
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
