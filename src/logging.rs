//! Structured logging setup
//!
//! Installs a global `tracing` subscriber filtered by `RUST_LOG` (default
//! `info`). Output goes to stderr so simulator reports on stdout stay clean.

use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

static INITIALISED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unsupported log format `{0}`; expected `human` or `json`")]
    UnsupportedFormat(String),

    #[error("Failed to install tracing subscriber: {0}")]
    InstallFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" | "" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init_logging(format: LogFormat) -> Result<(), LoggingError> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Human => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| LoggingError::InstallFailed(e.to_string()))?;

    let _ = INITIALISED.set(());
    Ok(())
}
