//! Prometheus-backed metrics for signing round-trips.
//!
//! # Design
//! - Encapsulates collector registration so the public API stays small.
//! - Tracks request outcomes per role plus end-to-end durations.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Role label for Builder-side observations.
pub const ROLE_BUILDER: &str = "builder";
/// Role label for server-side observations.
pub const ROLE_SIGNER: &str = "signer";

/// Metrics registry shared across the relay pipelines.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    sign_requests_total: IntCounterVec,
    sign_request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Construct a registry with the relay collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any prometheus collector cannot be registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let sign_requests_total = IntCounterVec::new(
            Opts::new(
                "sign_requests_total",
                "Signing requests observed, by role and outcome",
            ),
            &["role", "outcome"],
        )
        .map_err(|source| TelemetryError::MetricsRegistration { source })?;
        let sign_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "sign_request_duration_seconds",
                "End-to-end duration of signing requests, by role",
            ),
            &["role"],
        )
        .map_err(|source| TelemetryError::MetricsRegistration { source })?;

        registry
            .register(Box::new(sign_requests_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegistration { source })?;
        registry
            .register(Box::new(sign_request_duration_seconds.clone()))
            .map_err(|source| TelemetryError::MetricsRegistration { source })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                sign_requests_total,
                sign_request_duration_seconds,
            }),
        })
    }

    /// Count one request outcome for a role.
    pub fn inc_request(&self, role: &str, outcome: &str) {
        self.inner
            .sign_requests_total
            .with_label_values(&[role, outcome])
            .inc();
    }

    /// Record the end-to-end duration of one request for a role.
    pub fn observe_duration(&self, role: &str, duration: Duration) {
        self.inner
            .sign_request_duration_seconds
            .with_label_values(&[role])
            .observe(duration.as_secs_f64());
    }

    /// Render the registry in the prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncoding { source })?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Snapshot selected counters for health logging.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            builder_signed_total: self.outcome_count(ROLE_BUILDER, "signed"),
            builder_failed_total: self.outcome_count(ROLE_BUILDER, "failed"),
            signer_signed_total: self.outcome_count(ROLE_SIGNER, "signed"),
            signer_failed_total: self.outcome_count(ROLE_SIGNER, "failed"),
        }
    }

    fn outcome_count(&self, role: &str, outcome: &str) -> u64 {
        self.inner
            .sign_requests_total
            .with_label_values(&[role, outcome])
            .get()
    }
}

/// Snapshot of request counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests the Builder completed successfully.
    pub builder_signed_total: u64,
    /// Requests the Builder gave up on.
    pub builder_failed_total: u64,
    /// Requests the server signed and published.
    pub signer_signed_total: u64,
    /// Requests the server failed to sign.
    pub signer_failed_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn counters_accumulate_per_role_and_outcome() -> Result<(), Box<dyn Error>> {
        let metrics = Metrics::new()?;
        metrics.inc_request(ROLE_BUILDER, "signed");
        metrics.inc_request(ROLE_BUILDER, "signed");
        metrics.inc_request(ROLE_SIGNER, "failed");
        metrics.observe_duration(ROLE_BUILDER, Duration::from_millis(250));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.builder_signed_total, 2);
        assert_eq!(snapshot.builder_failed_total, 0);
        assert_eq!(snapshot.signer_failed_total, 1);
        Ok(())
    }

    #[test]
    fn render_emits_text_exposition() -> Result<(), Box<dyn Error>> {
        let metrics = Metrics::new()?;
        metrics.inc_request(ROLE_SIGNER, "signed");
        let rendered = metrics.render()?;
        assert!(rendered.contains("sign_requests_total"));
        Ok(())
    }
}
