//! Error types for calendar provider operations.
//!
//! Every adapter failure is a [`ProviderError`]. The proxy endpoint treats
//! them all alike (a generic 500); the code and message exist for the
//! server-side log line.

use std::fmt;

use dayfocus_core::Provider;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The access token was rejected (401) or a token exchange failed.
    AuthenticationFailed,
    /// The token is valid but lacks access (403).
    AuthorizationFailed,
    /// Connection failure, timeout, DNS resolution, unreadable body.
    NetworkError,
    /// Any other non-2xx status from the upstream API.
    UpstreamStatus,
    /// The body did not match the expected schema.
    InvalidResponse,
    /// Missing or invalid adapter configuration.
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns a stable snake_case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::UpstreamStatus => "upstream_status",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<Provider>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn upstream_status(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::UpstreamStatus, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Maps a non-success HTTP status to the matching error.
    ///
    /// The canonical status text is always part of the message.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        let message = if body.trim().is_empty() {
            format!("API error ({} {})", status.as_u16(), reason)
        } else {
            format!("API error ({} {}): {}", status.as_u16(), reason, body.trim())
        };

        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::authentication(message),
            reqwest::StatusCode::FORBIDDEN => Self::authorization(message),
            _ => Self::upstream_status(message),
        }
    }

    /// Classifies a transport error from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }

    /// Sets the provider for this error.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
