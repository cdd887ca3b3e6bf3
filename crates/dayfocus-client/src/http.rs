//! HTTP backend talking to a dayfocus server.
//!
//! Calendar and session requests carry the session cookie when one is
//! configured. Sign-in cannot happen inside the terminal, so
//! [`HttpBackend::sign_in`] opens the server's sign-in route in the user's
//! browser instead.

use std::sync::Arc;

use dayfocus_core::{CalendarEvent, Provider};
use reqwest::header::{COOKIE, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::sync::{BoxFuture, SessionInfo, SyncBackend};

/// Opens a URL for the user.
pub type BrowserOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize)]
struct EventsBody {
    events: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`SyncBackend`] over the server's HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    server_url: Url,
    cookie: Option<HeaderValue>,
    opener: BrowserOpener,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("server_url", &self.server_url.as_str())
            .field("has_session", &self.cookie.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Builds a backend from the client configuration.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut server_url = Url::parse(&config.server_url).map_err(|e| {
            ClientError::Config(format!("invalid server_url {}: {}", config.server_url, e))
        })?;
        // Keep any path prefix when joining relative API paths.
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("dayfocus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        let mut backend = Self {
            client,
            server_url,
            cookie: None,
            opener: Arc::new(|url: &str| open::that(url)),
        };
        if let Some(session) = config.resolve_session()? {
            backend = backend.with_session(&config.cookie_name, &session)?;
        }
        Ok(backend)
    }

    /// Sends `name=value` as the session cookie.
    pub fn with_session(mut self, cookie_name: &str, value: &str) -> ClientResult<Self> {
        let header = HeaderValue::from_str(&format!("{}={}", cookie_name, value))
            .map_err(|_| ClientError::Config("session value is not a valid cookie".into()))?;
        self.cookie = Some(header);
        Ok(self)
    }

    /// Replaces the browser launcher.
    pub fn with_opener(mut self, opener: BrowserOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.server_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    /// The URL that starts a browser sign-in for `provider`.
    pub fn sign_in_url(&self, provider: Provider, callback_url: &str) -> ClientResult<Url> {
        let mut url = self.endpoint(&format!("api/auth/signin/{}", provider))?;
        url.query_pairs_mut()
            .append_pair("callbackUrl", callback_url);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(%method, url = %url, request_id = %request_id, "sending request");

        let mut request = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.clone());
        }
        request
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::NotAuthenticated);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_session(&self) -> ClientResult<SessionInfo> {
        let url = self.endpoint("api/auth/session")?;
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    async fn post_sign_out(&self) -> ClientResult<()> {
        let url = self.endpoint("api/auth/signout")?;
        self.send(self.request(reqwest::Method::POST, url)).await?;
        Ok(())
    }

    async fn get_events(&self, provider: Provider) -> ClientResult<Vec<CalendarEvent>> {
        let url = self.endpoint(&format!("api/calendar/{}", provider))?;
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        let body: EventsBody = response.json().await?;
        debug!(%provider, count = body.events.len(), "received events");
        Ok(body.events)
    }
}

impl SyncBackend for HttpBackend {
    fn session(&self) -> BoxFuture<'_, ClientResult<SessionInfo>> {
        Box::pin(self.get_session())
    }

    fn sign_in<'a>(
        &'a self,
        provider: Provider,
        callback_url: &'a str,
    ) -> BoxFuture<'a, ClientResult<()>> {
        Box::pin(async move {
            let url = self.sign_in_url(provider, callback_url)?;
            debug!(%provider, url = %url, "opening sign-in page");
            (self.opener)(url.as_str())
                .map_err(|e| ClientError::Connect(format!("failed to open browser: {}", e)))
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(self.post_sign_out())
    }

    fn fetch_events(&self, provider: Provider) -> BoxFuture<'_, ClientResult<Vec<CalendarEvent>>> {
        Box::pin(self.get_events(provider))
    }
}
