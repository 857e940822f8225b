//! Tracing subscriber bootstrap for processes embedding the executor.

use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to init tracing: {0}")]
    Init(String),
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Returns `TelemetryError::Init` if a global subscriber is already set.
pub fn init_tracing(log_format: LogFormat) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| TelemetryError::Init(err.to_string())),
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| TelemetryError::Init(err.to_string())),
    }
}
