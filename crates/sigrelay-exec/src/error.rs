//! Error types for command execution.

use std::io;

use thiserror::Error;

/// Result type for command execution.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors produced when running (or failing to run) signer commands.
#[derive(Debug, Error)]
pub enum ExecError {
    /// An empty command line was supplied.
    #[error("empty command")]
    EmptyCommand,
    /// The child process could not be started.
    #[error("command spawn failure")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The command exited with a disallowed non-zero status.
    #[error("command exited with failure status")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
        /// Combined stdout and stderr captured from the run, when any.
        output: String,
    },
}
