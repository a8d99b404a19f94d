//! Tar serialisation of a file set, with hardened extraction.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use tar::{Archive, Builder, EntryType};

use crate::error::{ArchiveError, ArchiveResult};
use crate::model::FileDescriptor;

/// Pack every descriptor's file into a fresh tar archive at `archive_path`.
///
/// Each file lands at its relative path with its permission bits. An existing
/// archive at the destination is overwritten. The finished archive is synced
/// to disk before this returns, so a ready marker created afterwards can
/// never be observed over a partially written archive, even on network
/// mounts. On failure a half-written archive may remain; callers discard it
/// via [`ArchiveWithIndicator::clean`](crate::ArchiveWithIndicator::clean).
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] when the archive cannot be created or any
/// source file cannot be read.
pub fn pack_files<'a, I>(files: I, archive_path: &Path) -> ArchiveResult<()>
where
    I: IntoIterator<Item = &'a FileDescriptor>,
{
    let archive = File::create(archive_path)
        .map_err(|source| ArchiveError::io("create_archive", archive_path, source))?;
    let mut builder = Builder::new(archive);
    builder.follow_symlinks(false);

    for file in files {
        builder
            .append_path_with_name(file.absolute_path(), file.relative_path())
            .map_err(|source| {
                ArchiveError::io("append_entry", file.absolute_path().to_path_buf(), source)
            })?;
    }

    let archive = builder
        .into_inner()
        .map_err(|source| ArchiveError::io("finish_archive", archive_path, source))?;
    archive
        .sync_all()
        .map_err(|source| ArchiveError::io("sync_archive", archive_path, source))?;
    Ok(())
}

/// Extract every entry of the archive beneath `dest_dir`.
///
/// Entry paths are validated before anything is written: absolute paths,
/// parent-directory components, and non-file entry types (symlinks included)
/// are rejected outright, so no entry can place bytes outside `dest_dir`.
/// Permission bits recorded in the archive are restored on unix.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafeEntry`] for entries that fail validation
/// and [`ArchiveError::Io`] for filesystem failures.
pub fn extract_files(archive_path: &Path, dest_dir: &Path) -> ArchiveResult<()> {
    let file = File::open(archive_path)
        .map_err(|source| ArchiveError::io("open_archive", archive_path, source))?;
    let mut archive = Archive::new(file);

    let entries = archive
        .entries()
        .map_err(|source| ArchiveError::io("read_archive", archive_path, source))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|source| ArchiveError::io("read_entry", archive_path, source))?;
        let raw_path = entry
            .path()
            .map_err(|source| ArchiveError::io("decode_entry_path", archive_path, source))?
            .into_owned();
        let relative = sanitize_entry_path(archive_path, &raw_path)?;

        match entry.header().entry_type() {
            EntryType::Directory => {
                let destination = dest_dir.join(&relative);
                fs::create_dir_all(&destination)
                    .map_err(|source| ArchiveError::io("create_entry_dir", destination, source))?;
            }
            EntryType::Regular => {
                let destination = dest_dir.join(&relative);
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent).map_err(|source| {
                        ArchiveError::io("create_entry_parent", parent.to_path_buf(), source)
                    })?;
                }
                entry
                    .unpack(&destination)
                    .map_err(|source| ArchiveError::io("unpack_entry", destination, source))?;
            }
            _ => {
                return Err(ArchiveError::unsafe_entry(
                    archive_path,
                    raw_path.to_string_lossy().into_owned(),
                ));
            }
        }
    }
    Ok(())
}

fn sanitize_entry_path(archive_path: &Path, raw: &Path) -> ArchiveResult<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::unsafe_entry(
                    archive_path,
                    raw.to_string_lossy().into_owned(),
                ));
            }
        }
    }
    if sanitized.as_os_str().is_empty() {
        return Err(ArchiveError::unsafe_entry(
            archive_path,
            raw.to_string_lossy().into_owned(),
        ));
    }
    Ok(sanitized)
}
