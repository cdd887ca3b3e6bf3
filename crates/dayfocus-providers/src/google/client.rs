//! Google Calendar API client.
//!
//! Fetches the primary calendar's `events.list` for a window, following
//! `nextPageToken` until the last page, and normalizes every page.

use std::time::Duration;

use dayfocus_core::{CalendarEvent, Provider, TimeWindow};
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::http::{self, MAX_PAGES};
use crate::normalize::normalize_payload;
use crate::provider::{BoxFuture, CalendarProvider};

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar adapter.
#[derive(Debug, Clone)]
pub struct GoogleCalendarAdapter {
    http_client: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarAdapter {
    /// Creates an adapter for the `primary` calendar.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            base_url: CALENDAR_API_BASE.to_string(),
            calendar_id: "primary".to_string(),
        })
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_window(
        &self,
        access_token: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let url = http::join_url(
            &self.base_url,
            &format!(
                "calendars/{}/events",
                urlencoding::encode(&self.calendar_id)
            ),
        );
        let time_min = http::format_bound(window.start);
        let time_max = http::format_bound(window.end);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                ]);

            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let payload = http::fetch_payload(Provider::Google, request).await?;
            let next = payload.next_page().map(String::from);
            events.extend(normalize_payload(payload));

            match next {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(
                        "fetched {} events from calendar {} in {} page(s)",
                        events.len(),
                        self.calendar_id,
                        page + 1
                    );
                    return Ok(events);
                }
            }
        }

        warn!(
            "stopped after {} pages of calendar {}, returning {} events",
            MAX_PAGES,
            self.calendar_id,
            events.len()
        );
        Ok(events)
    }
}

impl CalendarProvider for GoogleCalendarAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.fetch_window(access_token, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap(),
        )
    }

    async fn adapter(server: &MockServer) -> GoogleCalendarAdapter {
        GoogleCalendarAdapter::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn sends_window_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer tok-123"))
            .and(query_param("timeMin", "2024-03-15T09:00:00.000Z"))
            .and(query_param("timeMax", "2024-03-15T23:59:59.000Z"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "1",
                    "summary": "Standup",
                    "start": {"dateTime": "2024-03-15T10:00:00Z"},
                    "end": {"dateTime": "2024-03-15T10:15:00Z"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = adapter(&server)
            .await
            .list_events("tok-123", window())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Standup");
        assert!(!events[0].is_all_day);
    }

    #[tokio::test]
    async fn follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "a", "start": {"date": "2024-03-15"}}],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "b", "start": {"dateTime": "2024-03-15T12:00:00Z"}}]
            })))
            .mount(&server)
            .await;

        let events = adapter(&server)
            .await
            .list_events("tok", window())
            .await
            .unwrap();

        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_events("expired", window())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some(Provider::Google));
    }

    #[tokio::test]
    async fn server_error_is_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_events("tok", window())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::UpstreamStatus);
        assert!(err.message().contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_events("tok", window())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let adapter = GoogleCalendarAdapter::new(Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let err = adapter.list_events("tok", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }

    #[tokio::test]
    async fn custom_calendar_id_is_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/work%40example.com/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let events = adapter(&server)
            .await
            .with_calendar_id("work@example.com")
            .list_events("tok", window())
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
