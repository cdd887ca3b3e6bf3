use std::time::Duration;

use dayfocus_core::{CalendarEvent, Provider, TimeWindow};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, MAX_PAGES};
use crate::normalize::normalize_payload;
use crate::provider::{BoxFuture, CalendarProvider};

/// Base URL for Microsoft Graph v1.0.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Ask Graph to report times in UTC so naive `dateTime` values are UTC.
const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

/// Microsoft Graph calendar adapter.
#[derive(Debug, Clone)]
pub struct MicrosoftCalendarAdapter {
    http_client: reqwest::Client,
    base_url: String,
}

impl MicrosoftCalendarAdapter {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            base_url: GRAPH_API_BASE.to_string(),
        })
    }

    /// Overrides the Graph base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that a `@odata.nextLink` stays on the Graph origin before the
    /// bearer token is sent to it.
    fn next_page_url(&self, link: &str) -> ProviderResult<Url> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::configuration(format!("invalid Graph base URL {}: {}", self.base_url, e))
                .with_provider(Provider::Microsoft)
                .with_source(e)
        })?;
        let next = Url::parse(link).map_err(|e| {
            ProviderError::invalid_response(format!("unparsable @odata.nextLink: {}", e))
                .with_provider(Provider::Microsoft)
                .with_source(e)
        })?;

        if next.origin() != base.origin() {
            warn!(host = ?next.host_str(), "refusing @odata.nextLink to another origin");
            return Err(ProviderError::invalid_response(format!(
                "@odata.nextLink points outside {}",
                base.origin().ascii_serialization()
            ))
            .with_provider(Provider::Microsoft));
        }
        Ok(next)
    }

    async fn fetch_window(
        &self,
        access_token: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let first = self
            .http_client
            .get(http::join_url(&self.base_url, "me/calendarView"))
            .query(&[
                ("startDateTime", http::format_bound(window.start)),
                ("endDateTime", http::format_bound(window.end)),
                ("$orderby", "start/dateTime".to_string()),
            ]);

        let mut events = Vec::new();
        let mut request = Some(first);

        for page in 0..MAX_PAGES {
            let Some(builder) = request.take() else {
                break;
            };
            let builder = builder
                .bearer_auth(access_token)
                .header("Prefer", OUTLOOK_TIMEZONE_HEADER);

            let payload = http::fetch_payload(Provider::Microsoft, builder).await?;
            let next = payload.next_page().map(String::from);
            events.extend(normalize_payload(payload));

            match next {
                Some(link) => request = Some(self.http_client.get(self.next_page_url(&link)?)),
                None => {
                    debug!("fetched {} events in {} page(s)", events.len(), page + 1);
                    return Ok(events);
                }
            }
        }

        if request.is_some() {
            warn!(
                "stopped after {} pages of calendarView, returning {} events",
                MAX_PAGES,
                events.len()
            );
        }
        Ok(events)
    }
}

impl CalendarProvider for MicrosoftCalendarAdapter {
    fn provider(&self) -> Provider {
        Provider::Microsoft
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
            Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 22, 59, 59).unwrap(),
        )
    }

    fn adapter(server: &MockServer) -> MicrosoftCalendarAdapter {
        MicrosoftCalendarAdapter::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn queries_calendar_view() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .and(header("authorization", "Bearer eyJ0"))
            .and(header("prefer", OUTLOOK_TIMEZONE_HEADER))
            .and(query_param("startDateTime", "2024-03-15T08:00:00.000Z"))
            .and(query_param("endDateTime", "2024-03-15T22:59:59.000Z"))
            .and(query_param("$orderby", "start/dateTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "id": "AAMk1",
                    "subject": "1:1",
                    "start": {"dateTime": "2024-03-15T09:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2024-03-15T09:30:00.0000000", "timeZone": "UTC"},
                    "isAllDay": false
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = adapter(&server).list_events("eyJ0", window()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "1:1");
        assert_eq!(events[0].duration_minutes(), Some(30));
    }

    #[tokio::test]
    async fn follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .and(query_param_is_missing("$skip"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "a", "start": {"dateTime": "2024-03-15T09:00:00"}}],
                "@odata.nextLink": format!("{}/me/calendarView?$skip=1", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .and(query_param("$skip", "1"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "b", "start": {"dateTime": "2024-03-15T10:00:00"}}]
            })))
            .mount(&server)
            .await;

        let events = adapter(&server).list_events("tok", window()).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn next_link_to_another_host_is_refused() {
        let server = MockServer::start().await;
        let foreign = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "a", "start": {"dateTime": "2024-03-15T09:00:00"}}],
                "@odata.nextLink": format!("{}/me/calendarView?$skip=1", foreign.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(0)
            .mount(&foreign)
            .await;

        let err = adapter(&server).list_events("tok", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        assert_eq!(err.provider(), Some(Provider::Microsoft));
        assert!(foreign.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_next_link_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [],
                "@odata.nextLink": "not a url"
            })))
            .mount(&server)
            .await;

        let err = adapter(&server).list_events("tok", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn error_carries_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = adapter(&server).list_events("tok", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UpstreamStatus);
        assert_eq!(err.provider(), Some(Provider::Microsoft));
        assert!(err.message().contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn forbidden_is_authorization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = adapter(&server).list_events("tok", window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthorizationFailed);
    }
}
