//! OAuth 2.0 authorization code flow with PKCE.
//!
//! The server drives the flow in two steps:
//!
//! 1. [`OAuthClient::authorization_url`] builds the consent URL for a fresh
//!    [`PkceFlow`] (verifier, S256 challenge and random state).
//! 2. [`OAuthClient::exchange_code`] trades the code from the redirect plus
//!    the flow's verifier for tokens at the provider's token endpoint.
//!
//! Refresh is not performed: an expired access token shows up as an
//! authentication error on the next calendar fetch.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dayfocus_core::Provider;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::http;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Random bytes in the state parameter.
const STATE_LENGTH: usize = 16;

/// Authorization and token endpoints of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthEndpoints {
    /// Well-known endpoints for `provider`.
    ///
    /// Microsoft uses the multi-tenant `common` authority.
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Google => Self {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
            },
            Provider::Microsoft => Self {
                authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                    .to_string(),
                token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                    .to_string(),
            },
        }
    }
}

/// Default scopes requested at sign-in.
pub fn default_scopes(provider: Provider) -> Vec<String> {
    let scopes: &[&str] = match provider {
        Provider::Google => &[
            "openid",
            "email",
            "https://www.googleapis.com/auth/calendar.readonly",
        ],
        Provider::Microsoft => &["openid", "email", "offline_access", "Calendars.Read"],
    };
    scopes.iter().map(|s| s.to_string()).collect()
}

/// OAuth 2.0 client credentials issued by the provider.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// PKCE flow state.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);

        Self {
            verifier,
            challenge,
            state: random_token(STATE_LENGTH),
        }
    }

    /// Computes the SHA-256 challenge for a code verifier.
    pub fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a URL-safe random token from `len` random bytes.
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Tokens returned by a successful code exchange.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// OAuth client for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    provider: Provider,
    credentials: OAuthCredentials,
    endpoints: OAuthEndpoints,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client with the provider's well-known endpoints and scopes.
    pub fn new(
        provider: Provider,
        credentials: OAuthCredentials,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            provider,
            credentials,
            endpoints: OAuthEndpoints::for_provider(provider),
            scopes: default_scopes(provider),
            http_client: http::build_client(timeout)?,
        })
    }

    pub fn with_endpoints(mut self, endpoints: OAuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Replaces the requested scopes; an empty list keeps the defaults.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        if !scopes.is_empty() {
            self.scopes = scopes;
        }
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Builds the consent URL for `flow`.
    pub fn authorization_url(&self, flow: &PkceFlow, redirect_uri: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize_url).map_err(|e| {
            ProviderError::configuration(format!(
                "invalid authorization endpoint {}: {}",
                self.endpoints.authorize_url, e
            ))
            .with_provider(self.provider)
            .with_source(e)
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.credentials.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("code_challenge", &flow.challenge)
                .append_pair("code_challenge_method", "S256")
                .append_pair("state", &flow.state);

            match self.provider {
                Provider::Google => {
                    query
                        .append_pair("access_type", "offline")
                        .append_pair("prompt", "consent");
                }
                Provider::Microsoft => {
                    query.append_pair("response_mode", "query");
                }
            }
        }

        debug!(provider = %self.provider, "built authorization URL");
        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Transport failures are network errors; a non-success answer from the
    /// token endpoint is an authentication error; an unreadable token body is
    /// an invalid response.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenResponse> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e).with_provider(self.provider))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
                .with_provider(self.provider)
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            ))
            .with_provider(self.provider));
        }

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
                .with_provider(self.provider)
                .with_source(e)
        })?;

        info!(provider = %self.provider, "obtained access token");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(provider: Provider) -> OAuthClient {
        OAuthClient::new(
            provider,
            OAuthCredentials::new("client-123", "secret-456"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // Base64 encoding of 32 bytes = 43 characters (no padding)
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_state_is_random() {
        let flow1 = PkceFlow::new();
        let flow2 = PkceFlow::new();
        assert_ne!(flow1.state, flow2.state);
        assert_ne!(flow1.verifier, flow2.verifier);
    }

    #[test]
    fn google_authorization_url() {
        let flow = PkceFlow::new();
        let url = client(Provider::Google)
            .authorization_url(&flow, "http://localhost:3000/api/auth/callback/google")
            .unwrap();

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(query_value(&url, "client_id").as_deref(), Some("client-123"));
        assert_eq!(
            query_value(&url, "redirect_uri").as_deref(),
            Some("http://localhost:3000/api/auth/callback/google")
        );
        assert_eq!(query_value(&url, "code_challenge"), Some(flow.challenge.clone()));
        assert_eq!(query_value(&url, "code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(query_value(&url, "state"), Some(flow.state.clone()));
        assert_eq!(query_value(&url, "access_type").as_deref(), Some("offline"));
        assert!(query_value(&url, "scope").unwrap().contains("calendar.readonly"));
    }

    #[test]
    fn microsoft_authorization_url() {
        let flow = PkceFlow::new();
        let url = client(Provider::Microsoft)
            .authorization_url(&flow, "http://localhost:3000/api/auth/callback/microsoft")
            .unwrap();

        assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
        assert_eq!(url.path(), "/common/oauth2/v2.0/authorize");
        assert!(query_value(&url, "scope").unwrap().contains("Calendars.Read"));
        assert_eq!(query_value(&url, "access_type"), None);
    }

    #[test]
    fn custom_scopes_replace_defaults() {
        let client = client(Provider::Google).with_scopes(vec!["custom".into()]);
        assert_eq!(client.scopes(), ["custom".to_string()]);

        let client = client.with_scopes(Vec::new());
        assert_eq!(client.scopes(), ["custom".to_string()]);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let debug = format!("{:?}", OAuthCredentials::new("id", "very-secret"));
        assert!(!debug.contains("very-secret"));
    }

    async fn client_against(server: &MockServer) -> OAuthClient {
        client(Provider::Google).with_endpoints(OAuthEndpoints {
            authorize_url: format!("{}/auth", server.uri()),
            token_url: format!("{}/token", server.uri()),
        })
    }

    #[tokio::test]
    async fn exchange_code_posts_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client_against(&server)
            .await
            .exchange_code("auth-code", "the-verifier", "http://localhost/cb")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "ya29.token");
        assert_eq!(tokens.expires_in, Some(3599));
        assert!(!format!("{:?}", tokens).contains("ya29.token"));
    }

    #[tokio::test]
    async fn rejected_code_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let err = client_against(&server)
            .await
            .exchange_code("bad", "verifier", "http://localhost/cb")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn garbage_token_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = client_against(&server)
            .await
            .exchange_code("code", "verifier", "http://localhost/cb")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }
}
