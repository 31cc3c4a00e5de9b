use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::ConfigError;

/// Coarse classification of a [`GitError`]
///
/// Lets operators tell bad input apart from environmental trouble and from
/// operations a backend cannot perform, without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected URL or argument, nothing was launched
    Validation,
    /// External command exited non-zero or library call failed
    Process,
    /// Process was killed after exceeding its timeout
    Timeout,
    /// Index or ref lock held by another git process
    Lock,
    /// Branch, tag, ref, revision or submodule does not exist
    NotFound,
    /// Backend does not implement the requested capability
    Unsupported,
    /// Local environment problem: I/O, configuration, git installation
    Environment,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Process => "process",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Lock => "lock",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::Unsupported => "unsupported",
            ErrorCategory::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Invalid remote URL or argument: {value} ({reason})")]
    Validation { value: String, reason: String },

    #[error("Command '{command}' failed with exit code {exit_code}: {output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Command '{command}' timed out after {} seconds and was terminated", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("Lock held by another git process: {0}")]
    LockHeld(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation not supported by the {backend} backend: {operation}")]
    Unsupported {
        backend: &'static str,
        operation: String,
    },

    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.30")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Library error during {context}: {source}")]
    Library {
        context: String,
        #[source]
        source: git2::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GitError {
    /// Wrap a libgit2 error, keeping lock and not-found conditions distinguishable
    pub fn library(context: impl Into<String>, source: git2::Error) -> Self {
        let context = context.into();
        match source.code() {
            git2::ErrorCode::Locked => {
                GitError::LockHeld(format!("{}: {}", context, source.message()))
            }
            git2::ErrorCode::NotFound => {
                GitError::NotFound(format!("{}: {}", context, source.message()))
            }
            _ => GitError::Library { context, source },
        }
    }

    pub fn validation(value: impl Into<String>, reason: impl Into<String>) -> Self {
        GitError::Validation {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GitError::Validation { .. } => ErrorCategory::Validation,
            GitError::CommandFailed { .. }
            | GitError::Library { .. }
            | GitError::ParseError(_) => ErrorCategory::Process,
            GitError::Timeout { .. } => ErrorCategory::Timeout,
            GitError::LockHeld(_) => ErrorCategory::Lock,
            GitError::NotFound(_) => ErrorCategory::NotFound,
            GitError::Unsupported { .. } => ErrorCategory::Unsupported,
            GitError::NotARepository(_)
            | GitError::GitVersionTooOld(_)
            | GitError::GitVersionDetectionFailed(_)
            | GitError::Spawn { .. }
            | GitError::Config(_)
            | GitError::IoError(_) => ErrorCategory::Environment,
        }
    }

    /// Transient failures that may succeed when retried later
    pub fn is_transient(&self) -> bool {
        matches!(self.category(), ErrorCategory::Timeout | ErrorCategory::Lock)
    }
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;
