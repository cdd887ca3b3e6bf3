//! Router assembly and the serve loop.

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ServerResult;
use crate::signals::ShutdownSignal;
use crate::state::AppState;
use crate::{auth, calendar};

/// Builds the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/calendar/{provider}", get(calendar::list_events))
        .route("/api/auth/signin/{provider}", get(auth::sign_in))
        .route("/api/auth/callback/{provider}", get(auth::callback))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Serves `state` on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: ShutdownSignal,
) -> ServerResult<()> {
    let addr = listener.local_addr()?;
    info!("listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    info!("server stopped");
    Ok(())
}
