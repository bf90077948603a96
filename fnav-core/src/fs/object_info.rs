//! `src/fs/object_info.rs`
//! ============================================================
//! Filesystem metadata for one directory entry.
//!
//! A `FileEntry` is built once by the scanner and never changes afterwards,
//! except for the directory child count which is computed on first request.
//! For a working symlink the metadata describes the target; for a broken one
//! it describes the link itself.

// ------------------------------------------------------------
// Standard-library imports
// ------------------------------------------------------------

use std::ffi::OsStr;
use std::fs::{self, Metadata, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ------------------------------------------------------------
// Third-party crate imports
// ------------------------------------------------------------

use bytesize::ByteSize;
use chrono::{DateTime, Local, TimeZone};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing::info;

// ------------------------------------------------------------
// ObjectType — file, directory, or symlink.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    Dir,
    File,
    Symlink,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dir => write!(f, "Dir"),
            Self::File => write!(f, "File"),
            Self::Symlink => write!(f, "Symlink"),
        }
    }
}

// ------------------------------------------------------------
// LinkState — result of resolving a symlink during the scan.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    NotLink,
    Working,
    Broken,
}

// ------------------------------------------------------------
// EntryMeta — the subset of OS metadata the navigator uses.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub size: u64,
    pub modified: SystemTime,
    /// Raw `st_mode` bits.
    pub mode: u32,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl EntryMeta {
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ftype = meta.file_type();

        Self {
            size: meta.len(),
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            mode: raw_mode(meta),
            is_dir: ftype.is_dir(),
            is_symlink: ftype.is_symlink(),
        }
    }
}

#[cfg(unix)]
fn raw_mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn raw_mode(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o644 }
}

// ------------------------------------------------------------
// FileEntry
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path.
    pub path: PathBuf,

    pub name: CompactString,

    pub meta: EntryMeta,

    pub link_state: LinkState,

    count: OnceLock<u64>,
}

impl FileEntry {
    /// `lstat` the path and, for symlinks, try to adopt the target's metadata.
    ///
    /// Only the `lstat` error is returned; a failed target stat marks the
    /// entry as a broken link instead.
    pub fn from_path_sync(path: &Path) -> io::Result<Self> {
        let lstat: Metadata = fs::symlink_metadata(path)?;

        if !lstat.file_type().is_symlink() {
            return Ok(Self::from_meta(path, &lstat, LinkState::NotLink));
        }

        match fs::metadata(path) {
            Ok(target) => Ok(Self::from_meta(path, &target, LinkState::Working)),

            Err(e) => {
                info!("getting link destination info for {}: {}", path.display(), e);

                Ok(Self::from_meta(path, &lstat, LinkState::Broken))
            }
        }
    }

    /// Build from metadata the caller already holds.
    #[must_use]
    pub fn from_meta(path: &Path, meta: &Metadata, link_state: LinkState) -> Self {
        Self::with_meta(path, EntryMeta::from_metadata(meta), link_state)
    }

    #[must_use]
    pub fn with_meta(path: &Path, meta: EntryMeta, link_state: LinkState) -> Self {
        let name = CompactString::new(
            path.file_name()
                .map_or_else(|| path.to_string_lossy(), OsStr::to_string_lossy),
        );

        Self {
            path: path.to_path_buf(),
            name,
            meta,
            link_state,
            count: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.meta.is_dir
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.meta.size
    }

    #[inline]
    #[must_use]
    pub const fn modified(&self) -> SystemTime {
        self.meta.modified
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.meta.mode
    }

    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        if self.meta.is_dir {
            ObjectType::Dir
        } else if !matches!(self.link_state, LinkState::NotLink) {
            ObjectType::Symlink
        } else {
            ObjectType::File
        }
    }

    /// Lower-case extension of regular files.
    #[must_use]
    pub fn extension(&self) -> Option<CompactString> {
        if self.meta.is_dir {
            return None;
        }

        self.path
            .extension()
            .and_then(OsStr::to_str)
            .map(|s: &str| -> CompactString { CompactString::new(s.to_lowercase()) })
    }

    #[inline]
    #[must_use]
    pub fn size_human(&self) -> String {
        ByteSize::b(self.meta.size).to_string()
    }

    #[expect(clippy::cast_possible_wrap, reason = "Expected")]
    #[must_use]
    pub fn format_date(&self, fmt: &str) -> String {
        let dur: Duration = self
            .meta
            .modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| -> Duration { Duration::from_secs(0) });

        let dt: DateTime<Local> = Local
            .timestamp_opt(dur.as_secs() as i64, dur.subsec_nanos())
            .single()
            .unwrap_or_else(|| -> DateTime<Local> { Local::now() });

        dt.format(fmt).to_string()
    }

    /// Child count if it has been computed already.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        self.count.get().copied()
    }

    /// Count directory children on first request. Unreadable directories count as 0.
    pub fn load_count(&self) -> u64 {
        *self.count.get_or_init(|| -> u64 {
            if !self.meta.is_dir {
                return 0;
            }

            fs::read_dir(&self.path).map_or(0, |r: ReadDir| -> u64 { r.count() as u64 })
        })
    }
}
