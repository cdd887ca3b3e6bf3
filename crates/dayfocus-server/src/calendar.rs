//! `GET /api/calendar/{provider}`: the calendar proxy.
//!
//! Stateless per request. The session's access token is handed to the
//! adapter for the path's provider and today's remaining events come back
//! as `{"events": [...]}`. Every adapter failure is logged here and answered
//! with the same generic 500.

use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::cookie::CookieJar;
use dayfocus_core::{CalendarEvent, Provider};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::state::AppState;

/// Success body of the proxy endpoint.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<CalendarEvent>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Json<EventsResponse>, ApiError> {
    let provider: Provider = provider.parse().map_err(|_| ApiError::UnknownProvider)?;

    // The session's own provider is not compared with the path: a token
    // sent to the other provider is simply rejected upstream.
    let Some((_, session)) = state.session_from(&jar).await else {
        return Err(ApiError::NotAuthenticated);
    };
    if !session.has_token() {
        return Err(ApiError::NotAuthenticated);
    }

    let adapter = state.adapter(provider).ok_or(ApiError::UnknownProvider)?;

    match adapter.list_today_events(&session.access_token).await {
        Ok(events) => {
            debug!(%provider, count = events.len(), "serving calendar events");
            Ok(Json(EventsResponse { events }))
        }
        Err(err) => {
            error!(%provider, code = %err.code(), "error fetching calendar events: {}", err);
            Err(ApiError::UpstreamFailure)
        }
    }
}
