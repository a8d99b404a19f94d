#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Logging initialisation and metrics for the signing relay.
//!
//! Layout: `init.rs` (tracing subscriber setup), `metrics.rs`
//! (prometheus-backed counters for signing round-trips).

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use init::{LogFormat, LoggingConfig, init_logging};
pub use metrics::{Metrics, MetricsSnapshot, ROLE_BUILDER, ROLE_SIGNER};
