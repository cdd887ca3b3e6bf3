//! Subcommand implementations.

pub mod agenda;
pub mod auth;
pub mod breathe;
pub mod config;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::http::HttpBackend;
use crate::sync::{EventsCallback, SyncController};

/// Builds a sync controller over the configured server.
pub(crate) fn controller(
    config: &ClientConfig,
    on_events: EventsCallback,
) -> ClientResult<SyncController> {
    let backend = HttpBackend::new(config)?;
    Ok(SyncController::new(
        Arc::new(backend),
        config.callback_url.clone(),
        on_events,
    ))
}
