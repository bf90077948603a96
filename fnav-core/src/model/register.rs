//! ``src/model/register.rs``
//!
//! Cached preview text for one file.

use std::path::{Path, PathBuf};

pub const LOADING_LINE: &str = "\x1b[1mloading...\x1b[0m";
pub const BINARY_LINE: &str = "\x1b[1mbinary\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterState {
    Loading,
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub path: PathBuf,
    pub state: RegisterState,
    pub lines: Vec<String>,
}

impl Register {
    #[must_use]
    pub fn loading(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: RegisterState::Loading,
            lines: vec![LOADING_LINE.to_string()],
        }
    }

    #[must_use]
    pub fn text(path: &Path, lines: Vec<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            state: RegisterState::Text,
            lines,
        }
    }

    #[must_use]
    pub fn binary(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: RegisterState::Binary,
            lines: vec![BINARY_LINE.to_string()],
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == RegisterState::Loading
    }
}
