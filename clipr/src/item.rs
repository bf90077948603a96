use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether the queued files are copied or moved when the operation is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipboardOperation {
    Copy,
    #[default]
    Move,
}

impl ClipboardOperation {
    #[must_use]
    pub const fn from_copy_flag(copy: bool) -> Self {
        if copy { Self::Copy } else { Self::Move }
    }

    #[must_use]
    pub const fn is_copy(self) -> bool {
        matches!(self, Self::Copy)
    }

    pub fn operation_tag(self) -> &'static str {
        match self {
            ClipboardOperation::Copy => "copy",
            ClipboardOperation::Move => "move",
        }
    }
}

impl std::fmt::Display for ClipboardOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.operation_tag())
    }
}

/// The single record of files queued for a copy or move.
///
/// Paths keep the order the user selected them in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingOperation {
    pub paths: Vec<PathBuf>,
    pub operation: ClipboardOperation,
}

impl PendingOperation {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, operation: ClipboardOperation) -> Self {
        Self { paths, operation }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }
}
