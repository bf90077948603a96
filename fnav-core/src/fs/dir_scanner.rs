//! ``src/fs/dir_scanner.rs``
//!
//! # `Directory Scanner`: one-shot directory enumeration
//!
//! Runs on the blocking pool. Entries that disappear between `readdir` and
//! `lstat` are dropped silently; any other per-entry failure is logged and
//! skipped so one bad entry never costs the rest of the listing.

use crate::error::AppError;
use crate::fs::object_info::FileEntry;
use std::fs::{self, DirEntry, ReadDir};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Enumerate `path` in directory order.
///
/// Fails only when the directory itself cannot be opened.
pub fn scan_dir(path: &Path) -> Result<Vec<FileEntry>, AppError> {
    let start_time: Instant = Instant::now();

    let read_dir: ReadDir = fs::read_dir(path)
        .map_err(|e| AppError::navigation_failed(path, e.to_string()))?;

    let mut entries: Vec<FileEntry> = Vec::new();

    for entry_result in read_dir {
        let entry: DirEntry = match entry_result {
            Ok(e) => e,

            Err(e) => {
                info!("reading directory entry in {}: {}", path.display(), e);
                continue;
            }
        };

        let entry_path: PathBuf = entry.path();

        match FileEntry::from_path_sync(&entry_path) {
            Ok(file) => entries.push(file),

            // Removed after enumeration.
            Err(e) if e.kind() == ErrorKind::NotFound => {}

            Err(e) => {
                info!("Failed to stat {:?}: {}", entry_path, e);
            }
        }
    }

    let duration: Duration = start_time.elapsed();
    debug!(
        marker = "DIRECTORY_SCAN",
        path = %path.display(),
        entries = entries.len(),
        "Directory scan completed in {:?}",
        duration
    );

    Ok(entries)
}
