//! Shared application state handed to every handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use dayfocus_core::Provider;
use dayfocus_providers::{CalendarProvider, OAuthClient, OAuthEndpoints, adapter_for};
use tracing::{info, warn};

use crate::config::{HttpSettings, ServerConfig};
use crate::error::ServerResult;
use crate::session::{Session, SharedSessions, new_shared_sessions};

/// Everything the routes need: adapters, sign-in clients and sessions.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessions,
    pub settings: Arc<HttpSettings>,
    adapters: Arc<HashMap<Provider, Arc<dyn CalendarProvider>>>,
    oauth_clients: Arc<HashMap<Provider, OAuthClient>>,
}

impl AppState {
    /// Creates a state with no adapters and no sign-in clients.
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            sessions: new_shared_sessions(),
            settings: Arc::new(settings),
            adapters: Arc::new(HashMap::new()),
            oauth_clients: Arc::new(HashMap::new()),
        }
    }

    /// Builds adapters for every provider and sign-in clients for the
    /// configured ones.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let timeout = config.server.request_timeout();
        let mut state = Self::new(config.server.clone());

        for provider in Provider::ALL {
            let settings = config.provider(provider);
            let base_url = settings.and_then(|s| s.api_base_url.as_deref());
            state = state.with_adapter(adapter_for(provider, base_url, timeout)?);

            let Some(settings) = settings else {
                info!(%provider, "no [{}] section, sign-in disabled", provider);
                continue;
            };
            let Some(credentials) = settings.credentials(provider)? else {
                warn!(%provider, "no client_id configured, sign-in disabled");
                continue;
            };

            let mut endpoints = OAuthEndpoints::for_provider(provider);
            if let Some(url) = &settings.authorize_url {
                endpoints.authorize_url = url.clone();
            }
            if let Some(url) = &settings.token_url {
                endpoints.token_url = url.clone();
            }

            let client = OAuthClient::new(provider, credentials, timeout)?
                .with_endpoints(endpoints)
                .with_scopes(settings.scopes.clone());
            state = state.with_oauth_client(client);
            info!(%provider, "sign-in enabled");
        }

        Ok(state)
    }

    /// Registers the adapter serving `adapter.provider()`.
    pub fn with_adapter(mut self, adapter: Arc<dyn CalendarProvider>) -> Self {
        Arc::make_mut(&mut self.adapters).insert(adapter.provider(), adapter);
        self
    }

    /// Registers the sign-in client for `client.provider()`.
    pub fn with_oauth_client(mut self, client: OAuthClient) -> Self {
        Arc::make_mut(&mut self.oauth_clients).insert(client.provider(), client);
        self
    }

    pub fn adapter(&self, provider: Provider) -> Option<Arc<dyn CalendarProvider>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn oauth_client(&self, provider: Provider) -> Option<&OAuthClient> {
        self.oauth_clients.get(&provider)
    }

    pub fn cookie_name(&self) -> &str {
        &self.settings.cookie_name
    }

    /// Looks up the caller's session from the session cookie.
    ///
    /// Returns the session id alongside a copy of the session so no lock is
    /// held by the caller.
    pub async fn session_from(&self, jar: &CookieJar) -> Option<(String, Session)> {
        let id = jar.get(self.cookie_name())?.value().to_string();
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id)?.clone();
        Some((id, session))
    }
}
