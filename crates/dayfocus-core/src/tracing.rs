//! Log setup for the two dayfocus binaries.
//!
//! `dayfocus-server` logs to stdout with timestamps, as compact lines or as
//! JSON lines for a log shipper. The `dayfocus` CLI logs to stderr without
//! timestamps so warnings never end up in piped command output; `--debug`
//! lowers the level and adds file and line. A non-empty `RUST_LOG` replaces
//! the preset filter in both.
//!
//! ```ignore
//! use dayfocus_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::server(cli.debug, cli.json_logs))?;
//! ```

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, writer::BoxMakeWriter},
    prelude::*,
    registry::LookupSpan,
};

/// Environment variable that overrides the preset filter.
pub const LOG_ENV: &str = "RUST_LOG";

/// Targets the preset filter applies to. Everything else stays silent.
const LOGGED_TARGETS: &[&str] = &["dayfocus", "tower_http"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid RUST_LOG directive: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    /// One JSON object per line.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// How a binary logs. Build one with [`TracingConfig::server`] or
/// [`TracingConfig::cli`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub timestamps: bool,
    /// Adds `file:line` to every record.
    pub locations: bool,
}

impl TracingConfig {
    /// The server: INFO (DEBUG with `--debug`) on stdout with timestamps.
    #[must_use]
    pub fn server(debug: bool, json: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::INFO },
            format: if json { LogFormat::Json } else { LogFormat::Compact },
            output: LogOutput::Stdout,
            timestamps: true,
            locations: false,
        }
    }

    /// The CLI: warnings only on stderr, or DEBUG with locations.
    #[must_use]
    pub fn cli(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::WARN },
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            timestamps: false,
            locations: debug,
        }
    }

    /// Filter used when `RUST_LOG` is unset or blank.
    pub fn default_directives(&self) -> String {
        LOGGED_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Builds the filter, preferring a non-blank `rust_log` over the preset.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::EnvFilter`] when `rust_log` does not parse.
    pub fn env_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, TracingError> {
        match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
            Some(directives) => Ok(EnvFilter::try_new(directives)?),
            None => Ok(EnvFilter::try_new(self.default_directives())?),
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let writer = match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        };
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(self.locations)
            .with_line_number(self.locations);

        match (self.format, self.timestamps) {
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
            (LogFormat::Json, true) => layer.json().boxed(),
            (LogFormat::Json, false) => layer.json().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, first thing in `main`.
///
/// # Errors
///
/// Fails when a subscriber is already installed or `RUST_LOG` is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let rust_log = std::env::var(LOG_ENV).ok();
    let filter = config.env_filter(rust_log.as_deref())?;
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(config.fmt_layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
