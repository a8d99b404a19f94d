//! Logging initialisation primitives.
//!
//! # Design
//! - Centralises logging setup (plain fmt or JSON) behind a single entry
//!   point so both roles configure output the same way.
//! - Every pipeline log line carries a `request_id` field supplied at the
//!   call site; nothing here holds per-request state.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Default logging target when no level is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable selecting the log output format.
pub const ENV_LOG_FORMAT: &str = "SIGRELAY_LOG_FORMAT";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g. `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    Text,
    /// JSON lines for log shippers.
    Json,
}

impl LogFormat {
    /// Infer the format from the environment, defaulting to text.
    #[must_use]
    pub fn infer() -> Self {
        match std::env::var(ENV_LOG_FORMAT).ok().as_deref() {
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if another subscriber has already been installed
/// globally.
pub fn init_logging(config: &LoggingConfig<'_>) -> TelemetryResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    result.map_err(|source| TelemetryError::SubscriberInstall { source })
}
