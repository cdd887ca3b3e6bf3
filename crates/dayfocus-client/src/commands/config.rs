//! Configuration commands.

use std::io::Write;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration, with the session value masked.
pub fn dump(config: &ClientConfig, out: &mut impl Write) -> ClientResult<()> {
    let mut shown = config.clone();
    if let Some(session) = shown.session.as_mut()
        && !session.starts_with("env::")
    {
        *session = "********".to_string();
    }

    let toml_str = toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# config.toml ({})", ClientConfig::default_path().display())?;
    writeln!(out, "{}", toml_str)?;
    Ok(())
}

/// Show the configuration file path.
pub fn path(out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "config: {}", ClientConfig::default_path().display())?;
    Ok(())
}
