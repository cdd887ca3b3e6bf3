//! HTTP server: calendar proxy, sign-in routes and sessions.
//!
//! This crate provides the dayfocus server that handles:
//! - `GET /api/calendar/{provider}`: today's events for the signed-in session
//! - OAuth sign-in, session lookup and sign-out under `/api/auth`
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Example
//!
//! ```rust,no_run
//! use dayfocus_server::{AppState, ServerConfig, SignalHandler, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::load()?;
//!     let state = AppState::from_config(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     serve(listener, state, signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod app;
mod auth;
mod calendar;
mod config;
mod error;
mod secret;
mod session;
mod signals;
mod state;

pub use app::{build_router, serve};
pub use auth::{SessionResponse, SignOutResponse, sanitize_callback_url};
pub use calendar::EventsResponse;
pub use config::{HttpSettings, ProviderSettings, ServerConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use secret::{SecretError, resolve as resolve_secret};
pub use session::{
    DEFAULT_SESSION_TTL, MAX_PENDING_SIGN_INS, MAX_SESSION_TTL, PENDING_SIGN_IN_TTL,
    PendingSignIn, Session, SessionStore, SharedSessions, new_shared_sessions, session_ttl,
};
pub use signals::{ShutdownSignal, SignalHandler};
pub use state::AppState;
