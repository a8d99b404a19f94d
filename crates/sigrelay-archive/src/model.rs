//! Request identifiers and file descriptors exchanged through the relay.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{ArchiveError, ArchiveResult};

/// Opaque identifier for one signing round-trip.
///
/// Rendered as the canonical hyphenated UUID form and used verbatim as the
/// filename stem for the request's archive and marker files in both
/// mailboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from a marker filename stem.
    ///
    /// Returns `None` for stems that are not canonical UUIDs; mailboxes on
    /// shared mounts accumulate foreign files and those must be skipped, not
    /// treated as fatal.
    #[must_use]
    pub fn from_stem(stem: &str) -> Option<Self> {
        Uuid::try_parse(stem).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pairing of a file's real filesystem location with the relative path it
/// occupies inside an archive or destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    absolute_path: PathBuf,
    relative_path: PathBuf,
}

impl FileDescriptor {
    /// Construct a descriptor from explicit absolute and relative paths.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidRelativePath`] when the relative path
    /// is empty, absolute, or contains parent-directory components.
    pub fn new(
        absolute_path: impl Into<PathBuf>,
        relative_path: impl Into<PathBuf>,
    ) -> ArchiveResult<Self> {
        let relative_path = relative_path.into();
        validate_relative(&relative_path)?;
        Ok(Self {
            absolute_path: absolute_path.into(),
            relative_path,
        })
    }

    /// Describe a single regular file: the relative path is its file name.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be resolved or has no file name.
    pub fn from_file(path: &Path) -> ArchiveResult<Self> {
        let absolute_path = path
            .canonicalize()
            .map_err(|source| ArchiveError::io("resolve_file", path, source))?;
        let relative_path = absolute_path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| ArchiveError::InvalidRelativePath {
                path: path.to_path_buf(),
            })?;
        Ok(Self {
            absolute_path,
            relative_path,
        })
    }

    /// Recursively enumerate every regular file beneath `dir`.
    ///
    /// Symlinks are not followed: a link pointing outside the directory
    /// would otherwise smuggle unrelated files into the archive or loop the
    /// walk. Entries come back in walkdir's sorted order so callers see a
    /// deterministic sequence.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be resolved or traversed.
    pub fn collect_directory(dir: &Path) -> ArchiveResult<Vec<Self>> {
        let root = dir
            .canonicalize()
            .map_err(|source| ArchiveError::io("resolve_directory", dir, source))?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|source| {
                ArchiveError::walkdir("collect_directory", root.clone(), source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative_path = entry
                .path()
                .strip_prefix(&root)
                .map_err(|_| ArchiveError::InvalidRelativePath {
                    path: entry.path().to_path_buf(),
                })?
                .to_path_buf();
            validate_relative(&relative_path)?;
            files.push(Self {
                absolute_path: entry.path().to_path_buf(),
                relative_path,
            });
        }
        Ok(files)
    }

    /// Location of the file on the local filesystem.
    #[must_use]
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Path the file occupies inside an archive or destination tree.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

fn validate_relative(path: &Path) -> ArchiveResult<()> {
    let mut seen_segment = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => seen_segment = true,
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::InvalidRelativePath {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    if seen_segment {
        Ok(())
    } else {
        Err(ArchiveError::InvalidRelativePath {
            path: path.to_path_buf(),
        })
    }
}
