//! Process-wide tracing setup for the Digito binaries.

use crate::errors::ErrorCode;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {detail}")]
    InvalidLevel { level: String, detail: String },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

impl LoggingError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InternalLoggingError
    }
}

/// Build the filter used by [`init_logging`].
///
/// `level` is either a bare level (`info`) applied to the Digito crates and
/// `warn` for everything else, or a full `EnvFilter` directive string.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => {
            let lower = level.to_lowercase();
            format!("warn,digito={lower},digito_common={lower}")
        }
        _ => level.to_string(),
    };
    EnvFilter::try_new(&directive).map_err(|err| LoggingError::InvalidLevel {
        level: level.to_string(),
        detail: err.to_string(),
    })
}

/// Install the global subscriber: an `EnvFilter` plus one fmt layer writing to stderr.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInstalled)
}
