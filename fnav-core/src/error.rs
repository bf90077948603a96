//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the Navigator
//!
//! Every fallible navigator operation returns `Result<T, AppError>`. Scan and
//! preview failures never reach this type: they are logged where they happen
//! and degrade to partial content.

use clipr::ClipError;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Unified error type for navigation, selection and transfer operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Requested file or directory does not exist.
    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// Directory navigation errors
    #[error("Navigation failed: cannot access {path:?}: {reason}")]
    NavigationFailed { path: PathBuf, reason: String },

    /// `open` on something that is not a directory.
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// The current directory has no visible entries.
    #[error("empty directory")]
    EmptyDirectory,

    /// Nothing marked and nothing highlighted.
    #[error("no file selected")]
    NoFileSelected,

    /// Commit requested with no pending operation.
    #[error("no file in yank/delete buffer")]
    EmptyBuffer,

    /// Search pattern that cannot be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Pending-operation store failure.
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipError),

    /// Copy/move job failure.
    #[error("File operation '{operation}' failed on {path:?}: {reason}")]
    TransferFailed {
        operation: String,
        path: PathBuf,
        reason: String,
    },

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    /// Create a navigation failure error
    pub fn navigation_failed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::NavigationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a transfer failure error
    pub fn transfer_failed<S1, P, S2>(operation: S1, path: P, reason: S2) -> Self
    where
        S1: Into<String>,
        P: Into<PathBuf>,
        S2: Into<String>,
    {
        Self::TransferFailed {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern<S1: Into<String>, S2: Into<String>>(pattern: S1, reason: S2) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// "Nothing to do" signals meant for the status line, not the log.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::EmptyDirectory | Self::NoFileSelected | Self::EmptyBuffer
        )
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_to_do_signals_are_user_facing() {
        assert!(AppError::EmptyBuffer.is_user_facing());
        assert!(AppError::NoFileSelected.is_user_facing());
        assert!(!AppError::NotADirectory(PathBuf::from("/etc/hosts")).is_user_facing());
    }

    #[test]
    fn test_navigation_error_mentions_path() {
        let err = AppError::navigation_failed("/nope", "No such file or directory");
        assert!(err.to_string().contains("/nope"));
    }
}
