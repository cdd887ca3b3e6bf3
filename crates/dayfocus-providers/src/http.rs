//! Shared HTTP plumbing for the REST adapters.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use dayfocus_core::Provider;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::schema::UpstreamPayload;

/// Default per-request timeout for upstream calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on followed continuation pages per fetch.
pub const MAX_PAGES: usize = 20;

/// Builds the reqwest client shared by an adapter.
pub(crate) fn build_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dayfocus/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                .with_source(e)
        })
}

/// Sends a request and parses the body with `provider`'s schema.
pub(crate) async fn fetch_payload(
    provider: Provider,
    request: reqwest::RequestBuilder,
) -> ProviderResult<UpstreamPayload> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(e).with_provider(provider))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status, &body).with_provider(provider));
    }

    let body = response.text().await.map_err(|e| {
        ProviderError::network(format!("failed to read response: {}", e))
            .with_provider(provider)
            .with_source(e)
    })?;

    let payload = UpstreamPayload::parse(provider, &body)?;
    debug!(%provider, records = payload.len(), "fetched event page");
    Ok(payload)
}

/// Formats an instant the way the upstream APIs expect window bounds.
pub(crate) fn format_bound(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Joins a configured base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bounds_are_utc_with_millis() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        assert_eq!(format_bound(instant), "2024-03-15T09:30:00.000Z");
    }

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join_url("http://x/v3/", "/calendars"), "http://x/v3/calendars");
        assert_eq!(join_url("http://x/v3", "calendars"), "http://x/v3/calendars");
    }
}
