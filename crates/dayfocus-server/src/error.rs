//! Server error types.
//!
//! [`ServerError`] covers startup (config, secrets, binding). [`ApiError`]
//! is what a handler returns; it renders as `{"error": "..."}` with the
//! matching status and never carries upstream detail to the client.

use std::io;
use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dayfocus_core::Provider;
use dayfocus_providers::ProviderError;
use serde_json::json;
use thiserror::Error;

use crate::secret::SecretError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid TOML for our schema.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A credential reference could not be resolved.
    #[error("failed to resolve {provider} {field}: {source}")]
    Secret {
        provider: Provider,
        field: &'static str,
        #[source]
        source: SecretError,
    },

    /// Adapter or OAuth client construction failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Errors answered to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unknown calendar provider")]
    UnknownProvider,

    #[error("Provider not configured")]
    ProviderNotConfigured,

    #[error("{0}")]
    BadRequest(String),

    #[error("Sign-in failed")]
    SignInFailed,

    #[error("Failed to fetch calendar events")]
    UpstreamFailure,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::UnknownProvider | Self::ProviderNotConfigured => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::SignInFailed => StatusCode::BAD_GATEWAY,
            Self::UpstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
