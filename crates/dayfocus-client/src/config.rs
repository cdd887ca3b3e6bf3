//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/dayfocus/config.toml` by default:
//!
//! ```toml
//! server_url = "http://localhost:3000"
//! session = "env::DAYFOCUS_SESSION"
//! callback_url = "/"
//! timeout = 10
//! ```
//!
//! The `session` value is the session cookie issued by the server after a
//! browser sign-in. It accepts `env::VAR_NAME` references.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const DEFAULT_COOKIE_NAME: &str = "dayfocus_session";

/// Configuration for the dayfocus client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the dayfocus server.
    pub server_url: String,

    /// Session cookie value, plain or `env::VAR`.
    pub session: Option<String>,

    /// Name of the server's session cookie.
    pub cookie_name: String,

    /// Where the server sends the browser after sign-in.
    pub callback_url: String,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            session: None,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            callback_url: "/".to_string(),
            timeout: 10,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayfocus")
            .join("config.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Resolves the session cookie value, expanding `env::` references.
    ///
    /// An empty value counts as no session.
    pub fn resolve_session(&self) -> ClientResult<Option<String>> {
        let Some(raw) = self.session.as_deref().map(str::trim) else {
            return Ok(None);
        };
        let value = match raw.strip_prefix("env::") {
            Some(var) => std::env::var(var).map_err(|_| {
                ClientError::Config(format!("environment variable {} is not set", var))
            })?,
            None => raw.to_string(),
        };
        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.cookie_name, "dayfocus_session");
        assert_eq!(config.callback_url, "/");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.resolve_session().unwrap(), None);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server_url = "https://focus.example.com"
session = "abc123"
timeout = 3
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server_url, "https://focus.example.com");
        assert_eq!(config.cookie_name, "dayfocus_session");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.resolve_session().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout = \"soon\"").unwrap();

        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn session_from_env_reference() {
        unsafe {
            std::env::set_var("_DF_TEST_SESSION", "from-env");
        }
        let config = ClientConfig {
            session: Some("env::_DF_TEST_SESSION".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_session().unwrap().as_deref(), Some("from-env"));
        unsafe {
            std::env::remove_var("_DF_TEST_SESSION");
        }
    }

    #[test]
    fn missing_env_reference_errors() {
        let config = ClientConfig {
            session: Some("env::_DF_TEST_SESSION_MISSING".into()),
            ..Default::default()
        };
        assert!(config.resolve_session().is_err());
    }

    #[test]
    fn blank_session_is_none() {
        let config = ClientConfig {
            session: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_session().unwrap(), None);
    }
}
