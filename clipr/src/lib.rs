//! # clipr - Pending Copy/Move Record for File Managers
//!
//! Holds the one queued copy-or-move operation a file manager session has
//! yanked or cut, and persists it so that other sessions of the same user can
//! pick it up.
//!
//! ## Key Features
//! - Ordered file list plus copy/move mode
//! - Async store trait so the owner never blocks on disk
//! - Atomic, versioned on-disk record

pub mod error;
pub mod item;
pub mod persistence;

pub use error::{ClipError, ClipResult};
pub use item::{ClipboardOperation, PendingOperation};
pub use persistence::{FileStore, PendingStore};
