//! dayfocus CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use dayfocus_core::{TracingConfig, init_tracing};

use dayfocus_client::cli::{Cli, Command, ConfigAction};
use dayfocus_client::commands;
use dayfocus_client::config::ClientConfig;
use dayfocus_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    if let Some(url) = &cli.server_url {
        config.server_url = url.clone();
    }
    if let Some(session) = &cli.session {
        config.session = Some(session.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    Ok(config)
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = load_config(&cli)?;
    let mut out = std::io::stdout();

    let result = match cli.command.unwrap_or(Command::Now { watch: false }) {
        Command::Now { watch } => commands::agenda::now(&config, watch, &mut out).await,
        Command::Today { json } => commands::agenda::today(&config, json, &mut out).await,
        Command::Connect { provider } => commands::auth::connect(&config, provider, &mut out).await,
        Command::Disconnect { provider } => {
            commands::auth::disconnect(&config, provider, &mut out).await
        }
        Command::Breathe { cycles } => commands::breathe::run(cycles, &mut out).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &mut out),
            ConfigAction::Path => commands::config::path(&mut out),
        },
    };
    out.flush()?;
    result
}
