//! `connect` and `disconnect`.

use std::io::Write;

use dayfocus_core::Provider;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::sync::{FlowOutcome, SyncController};

/// Opens the sign-in page for `provider` in the browser.
///
/// The session cookie ends up in the browser; copy its value into
/// `config.toml` (or `DAYFOCUS_SESSION`) to use it from the terminal.
pub async fn connect(
    config: &ClientConfig,
    provider: Provider,
    out: &mut impl Write,
) -> ClientResult<()> {
    let controller = super::controller(config, Box::new(|_| {}))?;
    run_connect(&controller, config, provider, out).await
}

pub(crate) async fn run_connect(
    controller: &SyncController,
    config: &ClientConfig,
    provider: Provider,
    out: &mut impl Write,
) -> ClientResult<()> {
    writeln!(out, "Connecting {}...", provider.display_name())?;
    match controller.connect(provider).await {
        FlowOutcome::Completed => {
            writeln!(out)?;
            writeln!(out, "A browser window opened for you to sign in.")?;
            writeln!(
                out,
                "Afterwards, copy the `{}` cookie into `session` in {}",
                config.cookie_name,
                ClientConfig::default_path().display()
            )?;
            writeln!(out, "or export it as DAYFOCUS_SESSION.")?;
            Ok(())
        }
        FlowOutcome::Busy | FlowOutcome::Failed => Err(ClientError::Connect(format!(
            "could not start sign-in for {}",
            provider
        ))),
    }
}

/// Signs out. This ends the whole session, not just `provider`.
pub async fn disconnect(
    config: &ClientConfig,
    provider: Provider,
    out: &mut impl Write,
) -> ClientResult<()> {
    let controller = super::controller(config, Box::new(|_| {}))?;
    run_disconnect(&controller, provider, out).await
}

pub(crate) async fn run_disconnect(
    controller: &SyncController,
    provider: Provider,
    out: &mut impl Write,
) -> ClientResult<()> {
    match controller.disconnect(provider).await {
        FlowOutcome::Completed => {
            writeln!(out, "Signed out; {} disconnected.", provider.display_name())?;
            Ok(())
        }
        FlowOutcome::Busy | FlowOutcome::Failed => Err(ClientError::Connect(format!(
            "could not disconnect {}",
            provider
        ))),
    }
}
