//! ``src/tasks/file_ops_task.rs``
//! ============================================================================
//! # Transfer runner: copy or move a batch of files into one directory
//!
//! The navigator hands the pending file list, the destination directory and
//! the operation to a `Transfer` and awaits the outcome. `FsTransfer` is the
//! filesystem implementation: recursive copy, rename with a copy-then-remove
//! fallback across devices, and `name.~N~` names when the target exists.

use std::{
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
    time::Instant,
};

use async_trait::async_trait;
use clipr::ClipboardOperation;
use tokio::fs as TokioFs;
use tracing::{debug, info};

use crate::error::AppError;

/// Performs the filesystem side of a committed copy or move.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(
        &self,
        files: &[PathBuf],
        dest: &Path,
        operation: ClipboardOperation,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsTransfer;

#[async_trait]
impl Transfer for FsTransfer {
    async fn transfer(
        &self,
        files: &[PathBuf],
        dest: &Path,
        operation: ClipboardOperation,
    ) -> Result<(), AppError> {
        let operation_id: String = nanoid::nanoid!();
        let start_time = Instant::now();
        let tag = operation.operation_tag();

        info!(
            operation_id = %operation_id,
            operation = tag,
            count = files.len(),
            dest = %dest.display(),
            "Starting transfer"
        );

        let dest_is_dir = TokioFs::metadata(dest).await.is_ok_and(|m| m.is_dir());
        if !dest_is_dir {
            return Err(AppError::transfer_failed(tag, dest, "destination is not a directory"));
        }

        for source in files {
            Self::transfer_one(source, dest, operation)
                .await
                .map_err(|e| AppError::transfer_failed(tag, source.as_path(), e.to_string()))?;
        }

        info!(
            operation_id = %operation_id,
            duration_ms = start_time.elapsed().as_millis(),
            "Transfer complete"
        );

        Ok(())
    }
}

impl FsTransfer {
    async fn transfer_one(
        source: &Path,
        dest: &Path,
        operation: ClipboardOperation,
    ) -> Result<(), Error> {
        let Some(name) = source.file_name() else {
            return Err(Self::error(
                ErrorKind::InvalidInput,
                "Cannot determine filename from source.",
            ));
        };

        let meta = TokioFs::symlink_metadata(source).await?;

        if meta.is_dir() && dest.starts_with(source) {
            return Err(Self::error(
                ErrorKind::InvalidInput,
                "Cannot transfer a directory into itself.",
            ));
        }

        // Moving into the directory the file already lives in changes nothing.
        if !operation.is_copy() && source.parent() == Some(dest) {
            debug!(path = %source.display(), "Move target is the source directory");
            return Ok(());
        }

        let target = Self::free_name(dest, &name.to_string_lossy()).await;

        if operation.is_copy() {
            Self::copy_path(source, &target).await
        } else {
            Self::move_path(source, &target).await
        }
    }

    /// First of `dest/name`, `dest/name.~1~`, `dest/name.~2~`, ... that does not exist.
    async fn free_name(dest: &Path, name: &str) -> PathBuf {
        let mut candidate = dest.join(name);
        let mut n: u32 = 1;

        while TokioFs::symlink_metadata(&candidate).await.is_ok() {
            candidate = dest.join(format!("{name}.~{n}~"));
            n += 1;
        }

        candidate
    }

    async fn move_path(source: &Path, target: &Path) -> Result<(), Error> {
        // Try efficient rename first (same filesystem)
        if TokioFs::rename(source, target).await.is_ok() {
            return Ok(());
        }

        debug!(path = %source.display(), "Rename failed, copying then removing");
        Self::copy_path(source, target).await?;

        if TokioFs::symlink_metadata(source).await?.is_dir() {
            TokioFs::remove_dir_all(source).await
        } else {
            TokioFs::remove_file(source).await
        }
    }

    async fn copy_path(source: &Path, target: &Path) -> Result<(), Error> {
        let meta = TokioFs::symlink_metadata(source).await?;

        if meta.is_dir() {
            Self::copy_dir(source, target).await
        } else if meta.file_type().is_symlink() {
            Self::copy_link(source, target).await
        } else {
            TokioFs::copy(source, target).await.map(|_| ())
        }
    }

    /// Walks the tree with an explicit stack instead of recursing.
    async fn copy_dir(source: &Path, target: &Path) -> Result<(), Error> {
        let mut stack: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), target.to_path_buf())];

        while let Some((src_dir, dst_dir)) = stack.pop() {
            TokioFs::create_dir_all(&dst_dir).await?;
            let mut entries = TokioFs::read_dir(&src_dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let src = entry.path();
                let dst = dst_dir.join(entry.file_name());
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    stack.push((src, dst));
                } else if file_type.is_symlink() {
                    Self::copy_link(&src, &dst).await?;
                } else {
                    TokioFs::copy(&src, &dst).await?;
                }
            }
        }

        Ok(())
    }

    #[cfg(unix)]
    async fn copy_link(source: &Path, target: &Path) -> Result<(), Error> {
        let link = TokioFs::read_link(source).await?;
        TokioFs::symlink(link, target).await
    }

    #[cfg(not(unix))]
    async fn copy_link(source: &Path, target: &Path) -> Result<(), Error> {
        TokioFs::copy(source, target).await.map(|_| ())
    }

    #[inline]
    fn error(err_kind: ErrorKind, err_msg: &'static str) -> Error {
        Error::new(err_kind, err_msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let root = TempDir::new().unwrap();
        let src = root.path().join("src");
        let dst = root.path().join("dst");
        std::fs::create_dir(&src).unwrap();
        std::fs::create_dir(&dst).unwrap();
        (root, src, dst)
    }

    #[tokio::test]
    async fn test_copy_tree_keeps_source() {
        let (_root, src, dst) = setup();
        let tree = src.join("tree");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested/leaf.txt"), b"leaf").unwrap();
        std::fs::write(src.join("a.txt"), b"a").unwrap();

        FsTransfer
            .transfer(&[tree.clone(), src.join("a.txt")], &dst, ClipboardOperation::Copy)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dst.join("tree/nested/leaf.txt")).unwrap(), b"leaf");
        assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"a");
        assert!(tree.exists());
    }

    #[tokio::test]
    async fn test_move_removes_source() {
        let (_root, src, dst) = setup();
        let file = src.join("m.txt");
        std::fs::write(&file, b"m").unwrap();

        FsTransfer
            .transfer(&[file.clone()], &dst, ClipboardOperation::Move)
            .await
            .unwrap();

        assert!(!file.exists());
        assert_eq!(std::fs::read(dst.join("m.txt")).unwrap(), b"m");
    }

    #[tokio::test]
    async fn test_collision_gets_numbered_name() {
        let (_root, src, dst) = setup();
        std::fs::write(src.join("f"), b"new").unwrap();
        std::fs::write(dst.join("f"), b"old").unwrap();
        std::fs::write(dst.join("f.~1~"), b"older").unwrap();

        FsTransfer
            .transfer(&[src.join("f")], &dst, ClipboardOperation::Copy)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dst.join("f")).unwrap(), b"old");
        assert_eq!(std::fs::read(dst.join("f.~2~")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_directory_into_itself_fails() {
        let (_root, src, _dst) = setup();
        let inner = src.join("inner");
        std::fs::create_dir(&inner).unwrap();

        let err = FsTransfer
            .transfer(&[src.clone()], &inner, ClipboardOperation::Copy)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TransferFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let (_root, src, dst) = setup();

        let err = FsTransfer
            .transfer(&[src.join("ghost")], &dst, ClipboardOperation::Move)
            .await
            .unwrap_err();

        match err {
            AppError::TransferFailed { operation, path, .. } => {
                assert_eq!(operation, ClipboardOperation::Move.operation_tag());
                assert_eq!(path, src.join("ghost"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_destination_must_be_directory() {
        let (_root, src, dst) = setup();
        std::fs::write(src.join("f"), b"").unwrap();
        std::fs::write(dst.join("plain"), b"").unwrap();

        let result = FsTransfer
            .transfer(&[src.join("f")], &dst.join("plain"), ClipboardOperation::Copy)
            .await;

        assert!(result.is_err());
        assert!(src.join("f").exists());
    }
}
