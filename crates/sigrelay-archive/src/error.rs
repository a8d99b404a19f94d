//! # Design
//!
//! - Provide structured, constant-message errors for archive and mailbox
//!   operations.
//! - Capture operation context (paths, entry names) so failures are
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for archive and mailbox operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors produced by the archive and mailbox layer.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// IO failures while interacting with the filesystem.
    #[error("archive io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures while collecting files.
    #[error("archive walkdir failure")]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Root path being traversed.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// An archive entry attempted to escape the extraction root.
    #[error("unsafe archive entry")]
    UnsafeEntry {
        /// Archive containing the offending entry.
        archive: PathBuf,
        /// Entry name as recorded in the archive.
        entry: String,
    },
    /// A file descriptor carried an unusable relative path.
    #[error("invalid relative path")]
    InvalidRelativePath {
        /// Offending path value.
        path: PathBuf,
    },
}

impl ArchiveError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsafe_entry(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self::UnsafeEntry {
            archive: archive.into(),
            entry: entry.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;
    use walkdir::WalkDir;

    #[test]
    fn error_helpers_build_variants() -> Result<(), Box<dyn Error>> {
        let io_err = ArchiveError::io("read", "path", io::Error::other("io"));
        assert!(matches!(io_err, ArchiveError::Io { .. }));
        assert!(io_err.source().is_some());

        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("missing");
        let walk_source = WalkDir::new(&missing)
            .into_iter()
            .next()
            .and_then(Result::err)
            .ok_or_else(|| io::Error::other("expected walkdir error"))?;
        let walk_err = ArchiveError::walkdir("collect", &missing, walk_source);
        assert!(matches!(walk_err, ArchiveError::Walkdir { .. }));
        assert!(walk_err.source().is_some());

        let unsafe_err = ArchiveError::unsafe_entry("bundle.tar", "../evil");
        assert!(matches!(unsafe_err, ArchiveError::UnsafeEntry { .. }));
        Ok(())
    }
}
