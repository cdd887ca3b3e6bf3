//! Server configuration.
//!
//! Settings live in `server.toml`, by default at
//! `~/.config/dayfocus/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//! public_url = "http://localhost:3000"
//!
//! [google]
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "pass::dayfocus/google"
//!
//! [microsoft]
//! client_id = "env::AZURE_CLIENT_ID"
//! client_secret = "env::AZURE_CLIENT_SECRET"
//! ```
//!
//! A provider without a section still serves the calendar proxy (it only
//! needs the session's token) but cannot be signed in to.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dayfocus_core::Provider;
use dayfocus_providers::OAuthCredentials;
use serde::Deserialize;
use url::Url;

use crate::error::{ServerError, ServerResult};
use crate::secret;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSettings,
    pub google: Option<ProviderSettings>,
    pub microsoft: Option<ProviderSettings>,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Listen address.
    pub bind: SocketAddr,
    /// Externally visible base URL, used for OAuth redirect URIs.
    pub public_url: String,
    /// Upstream request timeout in seconds.
    pub request_timeout: u64,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            public_url: "http://localhost:3000".to_string(),
            request_timeout: 30,
            cookie_name: "dayfocus_session".to_string(),
            secure_cookies: false,
        }
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// The redirect URI registered with `provider`.
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!(
            "{}/api/auth/callback/{}",
            self.public_url.trim_end_matches('/'),
            provider
        )
    }
}

/// `[google]` / `[microsoft]` sections.
///
/// `client_id` and `client_secret` accept `env::` and `pass::` references.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Scopes requested at sign-in; empty keeps the provider defaults.
    pub scopes: Vec<String>,
    /// Calendar API base URL override.
    pub api_base_url: Option<String>,
    /// Authorization endpoint override.
    pub authorize_url: Option<String>,
    /// Token endpoint override.
    pub token_url: Option<String>,
}

impl ProviderSettings {
    /// Resolves the credential references.
    ///
    /// Returns `Ok(None)` when no client id is configured.
    pub fn credentials(&self, provider: Provider) -> ServerResult<Option<OAuthCredentials>> {
        let Some(client_id) = self.client_id.as_deref() else {
            return Ok(None);
        };

        let resolve = |field: &'static str, value: &str| {
            secret::resolve(value).map_err(|source| ServerError::Secret {
                provider,
                field,
                source,
            })
        };

        let client_id = resolve("client_id", client_id)?;
        let client_secret = match self.client_secret.as_deref() {
            Some(value) => resolve("client_secret", value)?,
            None => String::new(),
        };

        if client_id.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(OAuthCredentials::new(client_id, client_secret)))
    }
}

impl ServerConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayfocus")
            .join("server.toml")
    }

    /// Settings for `provider`, if its section is present.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderSettings> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Microsoft => self.microsoft.as_ref(),
        }
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> ServerResult<()> {
        Url::parse(&self.server.public_url).map_err(|e| {
            ServerError::config(format!(
                "public_url `{}` is not a valid URL: {}",
                self.server.public_url, e
            ))
        })?;
        if self.server.cookie_name.trim().is_empty() {
            return Err(ServerError::config("cookie_name must not be empty"));
        }
        if self.server.request_timeout == 0 {
            return Err(ServerError::config("request_timeout must be positive"));
        }
        Ok(())
    }
}
