//! Test fixtures: temporary shared-storage roots and file helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use sigrelay_config::RelayConfig;
use tempfile::TempDir;

/// Temporary shared-storage root with relay configuration tuned for tests.
pub struct SharedRootFixture {
    root: TempDir,
}

impl SharedRootFixture {
    /// Create a fresh shared-storage root.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("sigrelay-")
            .tempdir()
            .context("failed to create shared root fixture")?;
        Ok(Self { root })
    }

    /// Path of the shared-storage root.
    #[must_use]
    pub fn shared_dir(&self) -> &Path {
        self.root.path()
    }

    /// Relay configuration pointing at this root with fast test timings.
    #[must_use]
    pub fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::new(self.root.path());
        config.timeout = Duration::from_secs(5);
        config.poll_interval = Duration::from_millis(50);
        config
    }

    /// Same configuration with a custom reply timeout.
    #[must_use]
    pub fn config_with_timeout(&self, timeout: Duration) -> RelayConfig {
        let mut config = self.config();
        config.timeout = timeout;
        config
    }
}

/// Write a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error when the parent directories or file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent of {}", path.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write an executable file (mode `0o755` on unix).
///
/// # Errors
///
/// Returns an error when the file cannot be written or its mode changed.
pub fn write_executable(root: &Path, relative: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = write_file(root, relative, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to chmod {}", path.display()))?;
    }
    Ok(path)
}

/// Permission bits of a file (unix only).
///
/// # Errors
///
/// Returns an error when the file metadata cannot be read.
#[cfg(unix)]
pub fn read_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to read metadata of {}", path.display()))?;
    Ok(metadata.permissions().mode() & 0o777)
}
