//! Command-template signer: runs a configured command once per file.

use async_trait::async_trait;
use sigrelay_archive::FileDescriptor;
use sigrelay_exec::{Platform, run_command_or_mock};
use sigrelay_pipeline::{SignError, Signer};

/// Signer that appends each file's absolute path to a configured command
/// line and executes it through the platform mock seam.
///
/// When the server runs on a platform other than the command's target, the
/// command is logged instead of executed, which lets the whole relay be
/// rehearsed on a developer machine without the signing toolchain.
pub struct CommandSigner {
    command: Vec<String>,
    platform: Platform,
}

impl CommandSigner {
    /// Build a signer from a command template and its target platform.
    #[must_use]
    pub const fn new(command: Vec<String>, platform: Platform) -> Self {
        Self { command, platform }
    }
}

#[async_trait]
impl Signer for CommandSigner {
    // Signability is a Builder-side deployment decision; the server signs
    // whatever arrives in a request.
    fn should_sign(&self, _file: &FileDescriptor) -> bool {
        true
    }

    async fn sign_all_files(&self, files: &[FileDescriptor]) -> Result<(), SignError> {
        for file in files {
            let mut command = self.command.clone();
            command.push(file.absolute_path().display().to_string());
            run_command_or_mock(&command, self.platform)
                .await
                .map_err(|source| SignError::with_source("signing command failed", source))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fs;

    const fn foreign_platform() -> Platform {
        match Platform::current() {
            Platform::Linux | Platform::Windows => Platform::Macos,
            Platform::Macos => Platform::Linux,
        }
    }

    #[tokio::test]
    async fn foreign_platform_signing_is_mocked() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("tool.bin");
        fs::write(&file, b"payload")?;
        let descriptor = FileDescriptor::from_file(&file)?;

        let signer = CommandSigner::new(
            vec!["codesign".to_string(), "--sign".to_string()],
            foreign_platform(),
        );
        assert!(signer.should_sign(&descriptor));
        signer.sign_all_files(&[descriptor]).await?;
        // The mocked run must leave the file untouched.
        assert_eq!(fs::read(&file)?, b"payload");
        Ok(())
    }

    #[tokio::test]
    async fn failing_command_surfaces_sign_error() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("tool.bin");
        fs::write(&file, b"payload")?;
        let descriptor = FileDescriptor::from_file(&file)?;

        let signer = CommandSigner::new(
            vec!["sigrelay-test-no-such-binary".to_string()],
            Platform::current(),
        );
        let result = signer.sign_all_files(&[descriptor]).await;
        assert!(result.is_err());
        Ok(())
    }
}
