//! Sign-in routes.
//!
//! ```text
//! GET  /api/auth/signin/{provider}?callbackUrl=   303 -> provider consent page
//! GET  /api/auth/callback/{provider}?code&state   303 -> callbackUrl, sets cookie
//! GET  /api/auth/session                          {"provider": "google" | null}
//! POST /api/auth/signout                          {"signedOut": true}, clears cookie
//! ```

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use dayfocus_core::Provider;
use dayfocus_providers::PkceFlow;
use dayfocus_providers::oauth::random_token;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::{Position, Url};

use crate::error::ApiError;
use crate::session::{PendingSignIn, Session, session_ttl};
use crate::state::AppState;

/// Random bytes in a session id.
const SESSION_ID_LENGTH: usize = 32;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInParams {
    pub callback_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub provider: Option<Provider>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    pub signed_out: bool,
}

fn parse_provider(segment: &str) -> Result<Provider, ApiError> {
    segment.parse().map_err(|_| ApiError::UnknownProvider)
}

/// Keeps post-sign-in redirects on this site.
///
/// The candidate is resolved against `public_url` the way a browser would
/// and must keep its origin. Relative candidates come back as the resolved
/// path, absolute ones as the resolved URL; anything else falls back to `/`.
/// Backslashes are refused outright since browsers read them as `/`.
pub fn sanitize_callback_url(public_url: &str, candidate: Option<&str>) -> String {
    let Some(candidate) = candidate.map(str::trim).filter(|c| !c.is_empty()) else {
        return "/".to_string();
    };
    let Ok(public) = Url::parse(public_url) else {
        warn!("public URL {} does not parse, ignoring callback URL", public_url);
        return "/".to_string();
    };

    let target = Some(candidate)
        .filter(|c| !c.contains('\\'))
        .and_then(|c| public.join(c).ok())
        .filter(|target| target.origin() == public.origin());

    match target {
        Some(target) if Url::parse(candidate).is_ok() => target.to_string(),
        Some(target) => target[Position::BeforePath..].to_string(),
        None => {
            warn!("rejecting off-site callback URL {}", candidate);
            "/".to_string()
        }
    }
}

pub async fn sign_in(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<SignInParams>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;
    let client = state
        .oauth_client(provider)
        .ok_or(ApiError::ProviderNotConfigured)?;

    let flow = PkceFlow::new();
    let redirect_uri = state.settings.redirect_uri(provider);
    let url = client
        .authorization_url(&flow, &redirect_uri)
        .map_err(|err| {
            error!(%provider, "cannot build authorization URL: {}", err);
            ApiError::ProviderNotConfigured
        })?;

    let callback_url =
        sanitize_callback_url(&state.settings.public_url, params.callback_url.as_deref());
    state.sessions.write().await.insert_pending(
        flow.state.clone(),
        PendingSignIn::new(provider, flow.verifier.clone(), callback_url),
    );

    info!(%provider, "redirecting to provider sign-in");
    Ok(Redirect::to(url.as_str()))
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let provider = parse_provider(&provider)?;

    if let Some(error) = params.error {
        warn!(%provider, error = %error, description = ?params.error_description, "provider refused sign-in");
        return Err(ApiError::BadRequest(format!("Sign-in was not completed: {}", error)));
    }

    let pending = match params.state.as_deref() {
        Some(s) => state.sessions.write().await.take_pending(s),
        None => None,
    };
    let Some(pending) = pending.filter(|p| p.provider == provider) else {
        warn!(%provider, "callback with unknown or expired state");
        return Err(ApiError::BadRequest("Invalid sign-in state".to_string()));
    };
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Err(ApiError::BadRequest("Missing authorization code".to_string()));
    };

    let client = state
        .oauth_client(provider)
        .ok_or(ApiError::ProviderNotConfigured)?;

    let redirect_uri = state.settings.redirect_uri(provider);
    let tokens = client
        .exchange_code(&code, &pending.verifier, &redirect_uri)
        .await
        .map_err(|err| {
            error!(%provider, "token exchange failed: {}", err);
            ApiError::SignInFailed
        })?;

    let ttl = session_ttl(tokens.expires_in);
    let session_id = random_token(SESSION_ID_LENGTH);
    state.sessions.write().await.insert(
        session_id.clone(),
        Session::new(provider, tokens.access_token, ttl),
    );

    let cookie = Cookie::build((state.cookie_name().to_string(), session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.secure_cookies);

    info!(%provider, "signed in");
    Ok((jar.add(cookie), Redirect::to(&pending.callback_url)))
}

pub async fn session(State(state): State<AppState>, jar: CookieJar) -> Json<SessionResponse> {
    let provider = state
        .session_from(&jar)
        .await
        .map(|(_, session)| session.provider);
    Json(SessionResponse { provider })
}

/// Ends the caller's whole session, whatever provider it belongs to.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SignOutResponse>) {
    if let Some(cookie) = jar.get(state.cookie_name()) {
        let id = cookie.value().to_string();
        if let Some(session) = state.sessions.write().await.remove(&id) {
            info!(provider = %session.provider, "signed out");
        }
    }

    let removal = Cookie::build((state.cookie_name().to_string(), "")).path("/");
    (
        jar.remove(removal),
        Json(SignOutResponse { signed_out: true }),
    )
}
