//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dayfocus_core::Provider;

/// dayfocus - your current and next event, and a moment to breathe
#[derive(Debug, Parser)]
#[command(name = "dayfocus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DAYFOCUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Base URL of the dayfocus server
    #[arg(long, env = "DAYFOCUS_SERVER_URL")]
    pub server_url: Option<String>,

    /// Session cookie value from a browser sign-in
    #[arg(long, env = "DAYFOCUS_SESSION", hide_env_values = true)]
    pub session: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current and next event (default)
    Now {
        /// Keep running and refresh every minute
        #[arg(long, short)]
        watch: bool,
    },

    /// List all of today's events
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect a calendar by signing in through the browser
    Connect {
        #[arg(value_parser = parse_provider)]
        provider: Provider,
    },

    /// Disconnect a calendar (ends the whole session)
    Disconnect {
        #[arg(value_parser = parse_provider)]
        provider: Provider,
    },

    /// Run the breathing exercise
    Breathe {
        /// Stop after this many cycles
        #[arg(long, default_value = "4")]
        cycles: u32,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

fn parse_provider(value: &str) -> Result<Provider, String> {
    value.parse().map_err(|e: dayfocus_core::UnknownProvider| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_now() {
        let cli = Cli::try_parse_from(["dayfocus"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_connect_provider() {
        let cli = Cli::try_parse_from(["dayfocus", "connect", "Microsoft"]).unwrap();
        match cli.command {
            Some(Command::Connect { provider }) => assert_eq!(provider, Provider::Microsoft),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["dayfocus", "disconnect", "apple"]).is_err());
    }

    #[test]
    fn breathe_defaults_to_four_cycles() {
        let cli = Cli::try_parse_from(["dayfocus", "breathe"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Breathe { cycles: 4 })));
    }
}
