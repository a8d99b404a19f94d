//! # Design
//!
//! - Centralise application-level errors for bootstrap and the server loop.
//! - Keep error messages constant while carrying context fields.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// An environment variable carried an unusable value.
    #[error("invalid environment configuration")]
    InvalidEnv {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Value that failed to parse.
        value: String,
    },
    /// Configuration loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: sigrelay_config::ConfigError,
    },
    /// Telemetry setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: sigrelay_telemetry::TelemetryError,
    },
    /// The signing server pipeline failed.
    #[error("pipeline operation failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source pipeline error.
        source: sigrelay_pipeline::PipelineError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: sigrelay_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: sigrelay_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn pipeline(
        operation: &'static str,
        source: sigrelay_pipeline::PipelineError,
    ) -> Self {
        Self::Pipeline { operation, source }
    }
}
