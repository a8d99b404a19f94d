//! Error types for telemetry setup.

use thiserror::Error;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors produced while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("tracing subscriber already installed")]
    SubscriberInstall {
        /// Underlying installation error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A metrics collector could not be registered.
    #[error("metrics registration failure")]
    MetricsRegistration {
        /// Underlying prometheus error.
        source: prometheus::Error,
    },
    /// The metrics registry could not be rendered.
    #[error("metrics encoding failure")]
    MetricsEncoding {
        /// Underlying prometheus error.
        source: prometheus::Error,
    },
}
