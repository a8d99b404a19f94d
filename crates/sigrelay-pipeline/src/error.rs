//! # Design
//!
//! - Structured, constant-message errors for both pipeline roles.
//! - Every variant carries the context (operation, path, request id) an
//!   operator needs to correlate Builder failures with server logs.
//! - Nothing is retried here: each error aborts the current request and the
//!   other party's timeout is the sole recovery mechanism.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use sigrelay_archive::{ArchiveError, RequestId};
use thiserror::Error;

use crate::signer::SignError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced by the Builder and server pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO failures outside the archive layer.
    #[error("pipeline io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Archive or mailbox operations failed.
    #[error("pipeline archive failure")]
    Archive {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Underlying archive error.
        source: ArchiveError,
    },
    /// The Builder gave up waiting for a signed reply.
    #[error("timed out waiting for signed archive")]
    Timeout {
        /// Request that went unanswered.
        request_id: RequestId,
        /// How long the Builder waited.
        waited: Duration,
    },
    /// The injected signer capability failed.
    #[error("signing failed")]
    Signing {
        /// Request being signed when the failure occurred.
        request_id: RequestId,
        /// Underlying signer error.
        source: SignError,
    },
}

impl PipelineError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn archive(operation: &'static str, source: ArchiveError) -> Self {
        Self::Archive { operation, source }
    }
}
