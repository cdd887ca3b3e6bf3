//! dayfocus-server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dayfocus_core::{TracingConfig, init_tracing};
use dayfocus_server::{AppState, ServerConfig, ServerError, ServerResult, SignalHandler, serve};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Calendar proxy and sign-in server for dayfocus.
#[derive(Debug, Parser)]
#[command(name = "dayfocus-server", version, about)]
struct Cli {
    /// Path to server.toml (defaults to ~/.config/dayfocus/server.toml).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address, overrides `[server].bind`.
    #[arg(long, env = "DAYFOCUS_BIND")]
    bind: Option<SocketAddr>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::server(cli.debug, cli.json_logs)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(config.server.bind)
        .await
        .map_err(|e| ServerError::config(format!("cannot bind {}: {}", config.server.bind, e)))?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    info!(public_url = %config.server.public_url, "dayfocus-server starting");
    serve(listener, state, signals.shutdown()).await
}
