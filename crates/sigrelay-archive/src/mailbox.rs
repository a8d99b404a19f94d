//! Mailbox directories and the archive/ready-marker slot protocol.
//!
//! # Design
//!
//! - A mailbox is a well-known subdirectory (`unsigned/` or `signed/`) under
//!   the shared-storage root, polled by exactly one consumer role.
//! - A slot is the `{id}.tar` archive plus a zero-byte `{id}.ready` marker;
//!   the marker is only ever created after the archive is durably written,
//!   which is the correctness invariant the whole relay rests on.
//! - Consumers claim a slot by atomically renaming the ready marker to
//!   `{id}.claimed`, so an accidental second server instance can never pick
//!   up the same request.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};
use crate::model::RequestId;

const ARCHIVE_EXTENSION: &str = "tar";
const READY_EXTENSION: &str = "ready";
const CLAIMED_EXTENSION: &str = "claimed";

/// The two handoff directions under the shared-storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxKind {
    /// Requests written by Builders, consumed by the signing server.
    Unsigned,
    /// Replies written by the signing server, consumed by Builders.
    Signed,
}

impl MailboxKind {
    /// Directory name for this mailbox beneath the shared root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::Signed => "signed",
        }
    }
}

/// One direction of the shared-storage handoff.
#[derive(Debug, Clone)]
pub struct Mailbox {
    directory: PathBuf,
    kind: MailboxKind,
}

impl Mailbox {
    /// Address a mailbox beneath the configured shared-storage root.
    #[must_use]
    pub fn new(shared_root: &Path, kind: MailboxKind) -> Self {
        Self {
            directory: shared_root.join(kind.dir_name()),
            kind,
        }
    }

    /// Mailbox directory on disk.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Which handoff direction this mailbox carries.
    #[must_use]
    pub const fn kind(&self) -> MailboxKind {
        self.kind
    }

    /// Create the mailbox directory (and parents) if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when creation fails.
    pub fn ensure_exists(&self) -> ArchiveResult<()> {
        fs::create_dir_all(&self.directory)
            .map_err(|source| ArchiveError::io("create_mailbox", self.directory.clone(), source))
    }

    /// Address the slot for one request id in this mailbox.
    #[must_use]
    pub fn slot(&self, request_id: RequestId) -> ArchiveWithIndicator {
        ArchiveWithIndicator::for_request(&self.directory, request_id)
    }

    /// Scan for the first ready request in this mailbox.
    ///
    /// A missing mailbox directory means nothing is ready, not an error:
    /// the producer side may simply not have created it yet. Marker files
    /// whose stem is not a canonical UUID are skipped. Entries are scanned
    /// in sorted filename order so concurrent consumers contend on the same
    /// slot first and the claim rename settles the winner.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the directory listing fails for
    /// reasons other than the directory being absent.
    pub fn scan_ready(&self) -> ArchiveResult<Option<RequestId>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ArchiveError::io(
                    "scan_mailbox",
                    self.directory.clone(),
                    source,
                ));
            }
        };

        let mut ready = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|source| ArchiveError::io("scan_mailbox", self.directory.clone(), source))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(READY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match RequestId::from_stem(stem) {
                Some(id) => ready.push(id),
                None => {
                    debug!(mailbox = self.kind.dir_name(), stem, "skipping foreign marker file");
                }
            }
        }
        ready.sort_unstable_by_key(|id| id.to_string());
        Ok(ready.into_iter().next())
    }
}

/// One mailbox slot: the archive file plus its readiness marker.
#[derive(Debug, Clone)]
pub struct ArchiveWithIndicator {
    request_id: RequestId,
    archive_path: PathBuf,
    ready_path: PathBuf,
    claimed_path: PathBuf,
}

impl ArchiveWithIndicator {
    /// Compute the slot paths for a request beneath a mailbox directory.
    ///
    /// Pure path arithmetic; touches nothing on disk.
    #[must_use]
    pub fn for_request(mailbox_dir: &Path, request_id: RequestId) -> Self {
        let stem = request_id.to_string();
        Self {
            request_id,
            archive_path: mailbox_dir.join(format!("{stem}.{ARCHIVE_EXTENSION}")),
            ready_path: mailbox_dir.join(format!("{stem}.{READY_EXTENSION}")),
            claimed_path: mailbox_dir.join(format!("{stem}.{CLAIMED_EXTENSION}")),
        }
    }

    /// Request this slot belongs to.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Location of the archive file within the mailbox.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Whether the ready marker exists at this instant.
    ///
    /// An archive without its marker is not yet ready; a missing mailbox
    /// directory is likewise just "not ready".
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready_path.exists()
    }

    /// Create the empty ready marker.
    ///
    /// Callers must only do this once the archive is fully written and
    /// synced; the marker is the signal that the archive is safe to read.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the marker cannot be created.
    pub fn tag_ready(&self) -> ArchiveResult<()> {
        File::create(&self.ready_path)
            .map(|_| ())
            .map_err(|source| ArchiveError::io("tag_ready", self.ready_path.clone(), source))
    }

    /// Atomically claim this slot by renaming its ready marker.
    ///
    /// Returns `false` when the marker is already gone, meaning another
    /// consumer won the race; that is an expected outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the rename fails for reasons other
    /// than the marker being absent.
    pub fn claim(&self) -> ArchiveResult<bool> {
        match fs::rename(&self.ready_path, &self.claimed_path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ArchiveError::io(
                "claim_slot",
                self.ready_path.clone(),
                source,
            )),
        }
    }

    /// Delete the archive and both marker files if present.
    ///
    /// Idempotent: deleting an already-absent file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] for any deletion failure other than the
    /// file being absent.
    pub fn clean(&self) -> ArchiveResult<()> {
        for path in [&self.archive_path, &self.ready_path, &self.claimed_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(source) if source.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ArchiveError::io("clean_slot", path.clone(), source));
                }
            }
        }
        Ok(())
    }
}
