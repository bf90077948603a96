//! Error type for the pending-operation store

use compact_str::CompactString;
use std::io::ErrorKind;
use thiserror::Error;

pub type ClipResult<T> = Result<T, ClipError>;

#[derive(Error, Debug, Clone)]
pub enum ClipError {
    #[error("File system error on {path}: {kind:?}")]
    FileSystemError { path: CompactString, kind: ErrorKind },

    #[error("Serialization error: {0}")]
    SerializationError(CompactString),

    #[error("Clipboard deserialization failed: {0}")]
    DeserializationError(CompactString),

    #[error("Persistence version mismatch: expected {expected}, found {found}")]
    PersistenceVersionMismatch { expected: u32, found: u32 },

    #[error("Atomic save operation failed: {0}")]
    AtomicSaveError(CompactString),

    #[error("Persistence configuration error: {0}")]
    PersistenceConfigError(CompactString),
}

impl ClipError {
    /// Errors caused by an unreadable or foreign record rather than the filesystem.
    #[inline]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ClipError::DeserializationError(_) | ClipError::PersistenceVersionMismatch { .. }
        )
    }

    #[inline]
    pub fn file_system(path: &std::path::Path, io_error: &std::io::Error) -> Self {
        Self::FileSystemError {
            path: CompactString::from(path.to_string_lossy()),
            kind: io_error.kind(),
        }
    }

    #[inline]
    pub fn atomic_save_error(message: impl Into<CompactString>) -> Self {
        Self::AtomicSaveError(message.into())
    }
}

impl From<rmp_serde::encode::Error> for ClipError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ClipError::SerializationError(CompactString::from(err.to_string()))
    }
}

impl From<rmp_serde::decode::Error> for ClipError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        ClipError::DeserializationError(CompactString::from(err.to_string()))
    }
}
