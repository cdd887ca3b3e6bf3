//! CalendarProvider trait and implementations.
//!
//! This crate provides the adapter layer between upstream calendar APIs and
//! the canonical [`CalendarEvent`](dayfocus_core::CalendarEvent):
//!
//! - [`CalendarProvider`] - The trait every adapter implements
//! - [`UpstreamPayload`] - Typed upstream schemas, one variant per provider
//! - [`normalize_payload`] - Validation and mapping to canonical events
//! - [`OAuthClient`] - Authorization code + PKCE sign-in helper
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │ Google Calendar │    │ Microsoft Graph │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌────────────────────────────────────────┐
//! │            UpstreamPayload             │
//! └───────────────────┬────────────────────┘
//!                     │ validate() + normalize_payload()
//!                     ▼
//!              ┌───────────────┐
//!              │ CalendarEvent │
//!              └───────────────┘
//! ```

pub mod error;
pub mod google;
mod http;
pub mod microsoft;
pub mod normalize;
pub mod oauth;
pub mod provider;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use dayfocus_core::Provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::GoogleCalendarAdapter;
pub use http::{DEFAULT_TIMEOUT, MAX_PAGES};
pub use microsoft::MicrosoftCalendarAdapter;
pub use normalize::{normalize_google_event, normalize_graph_event, normalize_payload};
pub use oauth::{OAuthClient, OAuthCredentials, OAuthEndpoints, PkceFlow, TokenResponse};
pub use provider::{BoxFuture, CalendarProvider};
pub use schema::{SchemaViolation, UpstreamPayload};

/// Builds the default adapter for `provider`, optionally against a custom
/// API base URL.
pub fn adapter_for(
    provider: Provider,
    base_url: Option<&str>,
    timeout: Duration,
) -> ProviderResult<Arc<dyn CalendarProvider>> {
    let adapter: Arc<dyn CalendarProvider> = match provider {
        Provider::Google => {
            let mut adapter = GoogleCalendarAdapter::new(timeout)?;
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Arc::new(adapter)
        }
        Provider::Microsoft => {
            let mut adapter = MicrosoftCalendarAdapter::new(timeout)?;
            if let Some(url) = base_url {
                adapter = adapter.with_base_url(url);
            }
            Arc::new(adapter)
        }
    };
    Ok(adapter)
}
