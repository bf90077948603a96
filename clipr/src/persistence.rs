//! Pending-operation persistence with atomic saves
//!
//! The record is written to a temporary sibling file and renamed over the
//! real one, so a session reading the store concurrently sees either the old
//! record or the new one, never a torn write.

use crate::{ClipError, ClipResult, ClipboardOperation, PendingOperation};
use async_trait::async_trait;
use compact_str::CompactString;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// External home of the pending copy/move record.
///
/// The navigator only ever overwrites, reads, or clears the whole record.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Replace the stored record.
    async fn save(&self, operation: &PendingOperation) -> ClipResult<()>;

    /// Read the stored record. A store that was never written yields an empty record.
    async fn load(&self) -> ClipResult<PendingOperation>;

    async fn clear(&self) -> ClipResult<()> {
        self.save(&PendingOperation::default()).await
    }
}

/// Versioned on-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    version: u32,

    saved_at: u64,

    operation: ClipboardOperation,

    paths: Vec<PathBuf>,
}

/// File-backed store shared by every session of the same user.
#[derive(Debug, Clone)]
pub struct FileStore {
    file_path: PathBuf,

    temp_path: PathBuf,
}

impl FileStore {
    const CURRENT_VERSION: u32 = 1;

    #[must_use]
    pub fn new(file_path: PathBuf) -> Self {
        let temp_path = file_path.with_extension("tmp");

        Self {
            file_path,
            temp_path,
        }
    }

    /// Store located in the per-user data directory.
    pub fn default_location() -> ClipResult<Self> {
        let dirs = ProjectDirs::from("org", "fnav", "fnav").ok_or_else(|| {
            ClipError::PersistenceConfigError(CompactString::const_new(
                "Could not determine data directory",
            ))
        })?;

        Ok(Self::new(dirs.data_dir().join("pending")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn encode(operation: &PendingOperation) -> ClipResult<Vec<u8>> {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        let record = PersistedRecord {
            version: Self::CURRENT_VERSION,
            saved_at,
            operation: operation.operation,
            paths: operation.paths.clone(),
        };

        Ok(rmp_serde::to_vec(&record)?)
    }

    fn decode(data: &[u8]) -> ClipResult<PendingOperation> {
        let record: PersistedRecord = rmp_serde::from_slice(data)?;

        if record.version > Self::CURRENT_VERSION {
            return Err(ClipError::PersistenceVersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: record.version,
            });
        }

        Ok(PendingOperation::new(record.paths, record.operation))
    }

    async fn atomic_save(&self, data: &[u8]) -> ClipResult<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ClipError::file_system(parent, &e))?;
        }

        fs::write(&self.temp_path, data)
            .await
            .map_err(|e| ClipError::atomic_save_error(format!("Failed to write temp file: {e}")))?;

        fs::rename(&self.temp_path, &self.file_path)
            .await
            .map_err(|e| ClipError::atomic_save_error(format!("Failed to rename temp file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl PendingStore for FileStore {
    async fn save(&self, operation: &PendingOperation) -> ClipResult<()> {
        let data = Self::encode(operation)?;
        self.atomic_save(&data).await?;

        debug!(
            path = %self.file_path.display(),
            files = operation.len(),
            operation = %operation.operation,
            "Pending operation saved"
        );

        Ok(())
    }

    async fn load(&self) -> ClipResult<PendingOperation> {
        match fs::read(&self.file_path).await {
            Ok(data) => Self::decode(&data),

            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PendingOperation::default()),

            Err(e) => Err(ClipError::file_system(&self.file_path, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load_keeps_order_and_mode() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("state").join("pending"));

        let op = PendingOperation::new(
            vec![PathBuf::from("/tmp/c"), PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")],
            ClipboardOperation::Copy,
        );
        store.save(&op).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, op);
        assert!(!dir.path().join("state").join("pending.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_record() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("pending"));

        let loaded = store.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_clear_overwrites_previous_record() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("pending"));

        store
            .save(&PendingOperation::new(vec![PathBuf::from("/x")], ClipboardOperation::Move))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_is_reported_as_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending");
        std::fs::write(&path, b"\xc1\xc1\xc1 not msgpack").unwrap();

        let err = FileStore::new(path).load().await.unwrap_err();
        assert!(err.is_corruption());
    }
}
