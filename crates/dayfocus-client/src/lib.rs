//! Sync controller, HTTP backend, breathing routine, dashboard state
//!
//! This crate provides the `dayfocus` command-line interface.

pub mod breathing;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod sync;
pub mod timer;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use sync::{FlowOutcome, SessionInfo, SyncBackend, SyncController, SyncOutcome};
