//! The injected signing capability.
//!
//! Platform specifics (which tool to run, which files are signable) live in
//! implementations of [`Signer`] supplied by the embedding application; the
//! pipelines only ever talk to this trait.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use sigrelay_archive::FileDescriptor;

/// Capability implemented by platform-specific signers.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Whether a file should be submitted for signing (Builder side).
    fn should_sign(&self, file: &FileDescriptor) -> bool;

    /// Sign every file in place at its absolute path (server side).
    ///
    /// # Errors
    ///
    /// Implementations return a [`SignError`] when the signing tool fails;
    /// the server then abandons the request without publishing a reply.
    async fn sign_all_files(&self, files: &[FileDescriptor]) -> Result<(), SignError>;
}

/// Failure reported by a [`Signer`] implementation.
#[derive(Debug)]
pub struct SignError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl SignError {
    /// Create an error from a bare message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for SignError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn sign_error_exposes_message_and_source() {
        let bare = SignError::new("tool refused");
        assert_eq!(bare.to_string(), "tool refused");
        assert!(bare.source().is_none());

        let wrapped = SignError::with_source("tool crashed", io::Error::other("io"));
        assert_eq!(wrapped.to_string(), "tool crashed");
        assert!(wrapped.source().is_some());
    }
}
