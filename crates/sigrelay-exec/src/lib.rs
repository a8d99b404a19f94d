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

//! Command execution seam for platform-specific signers.
//!
//! A signer implementation targets one operating system. When the process
//! runs on that OS the command really executes; on any other OS it is only
//! logged, which lets the rest of the pipeline be exercised cross-platform
//! without the platform's signing toolchain installed.

pub mod error;

use tokio::process::Command;
use tracing::{debug, info};

pub use error::{ExecError, ExecResult};

/// Operating system a signer implementation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Linux hosts.
    Linux,
    /// Apple hosts.
    Macos,
    /// Windows hosts.
    Windows,
}

impl Platform {
    /// The platform this process is running on.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Stable lowercase name for logs and configuration values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    /// Parse a configuration value into a platform tag.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a command, or merely log it when this process is not on the
/// command's target platform.
///
/// # Errors
///
/// Returns [`ExecError::CommandFailed`] on a non-zero exit and
/// [`ExecError::Spawn`] when the process cannot be started.
pub async fn run_command_or_mock(command: &[String], target: Platform) -> ExecResult<()> {
    let rendered = render(command)?;
    if target != Platform::current() {
        info!(command = %rendered, target = %target, "mocked command for foreign platform");
        return Ok(());
    }

    debug!(command = %rendered, "executing command");
    let status = Command::new(&command[0])
        .args(&command[1..])
        .status()
        .await
        .map_err(|source| ExecError::Spawn {
            command: rendered.clone(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::CommandFailed {
            command: rendered,
            code: status.code(),
            output: String::new(),
        })
    }
}

/// Run a command capturing its combined stdout and stderr, or log it when
/// this process is not on the target platform (returning an empty string).
///
/// With `allow_nonzero_exit` the captured output is returned regardless of
/// exit status; otherwise a non-zero exit is an error carrying the output.
///
/// # Errors
///
/// Returns [`ExecError::CommandFailed`] on a disallowed non-zero exit and
/// [`ExecError::Spawn`] when the process cannot be started.
pub async fn check_output_or_mock(
    command: &[String],
    target: Platform,
    allow_nonzero_exit: bool,
) -> ExecResult<String> {
    let rendered = render(command)?;
    if target != Platform::current() {
        info!(command = %rendered, target = %target, "mocked command for foreign platform");
        return Ok(String::new());
    }

    debug!(command = %rendered, "executing command with captured output");
    let output = Command::new(&command[0])
        .args(&command[1..])
        .output()
        .await
        .map_err(|source| ExecError::Spawn {
            command: rendered.clone(),
            source,
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() || allow_nonzero_exit {
        Ok(combined)
    } else {
        Err(ExecError::CommandFailed {
            command: rendered,
            code: output.status.code(),
            output: combined,
        })
    }
}

fn render(command: &[String]) -> ExecResult<String> {
    if command.is_empty() {
        return Err(ExecError::EmptyCommand);
    }
    Ok(command.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn foreign_platform() -> Platform {
        match Platform::current() {
            Platform::Linux | Platform::Windows => Platform::Macos,
            Platform::Macos => Platform::Linux,
        }
    }

    #[test]
    fn platform_parse_accepts_known_names() {
        assert_eq!(Platform::parse("linux"), Some(Platform::Linux));
        assert_eq!(Platform::parse("Darwin"), Some(Platform::Macos));
        assert_eq!(Platform::parse(" windows "), Some(Platform::Windows));
        assert_eq!(Platform::parse("beos"), None);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let result = run_command_or_mock(&[], Platform::current()).await;
        assert!(matches!(result, Err(ExecError::EmptyCommand)));
    }

    #[tokio::test]
    async fn foreign_platform_commands_are_mocked() -> Result<(), Box<dyn std::error::Error>> {
        // A command that cannot exist anywhere; mocking must not spawn it.
        let command = vec!["sigrelay-test-no-such-binary".to_string()];
        run_command_or_mock(&command, foreign_platform()).await?;
        let output = check_output_or_mock(&command, foreign_platform(), false).await?;
        assert!(output.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_binary_surfaces_spawn_error() {
        let command = vec!["sigrelay-test-no-such-binary".to_string()];
        let result = run_command_or_mock(&command, Platform::current()).await;
        assert!(matches!(result, Err(ExecError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn check_output_honours_allow_nonzero() -> Result<(), Box<dyn std::error::Error>> {
        let failing = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo boom >&2; exit 3".to_string(),
        ];

        let output = check_output_or_mock(&failing, Platform::current(), true).await?;
        assert!(output.contains("boom"));

        let result = check_output_or_mock(&failing, Platform::current(), false).await;
        match result {
            Err(ExecError::CommandFailed { code, output, .. }) => {
                assert_eq!(code, Some(3));
                assert!(output.contains("boom"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_runs() -> Result<(), Box<dyn std::error::Error>> {
        let command = vec!["true".to_string()];
        run_command_or_mock(&command, Platform::current()).await?;

        let echo = vec!["echo".to_string(), "signed".to_string()];
        let output = check_output_or_mock(&echo, Platform::current(), false).await?;
        assert!(output.contains("signed"));
        Ok(())
    }
}
