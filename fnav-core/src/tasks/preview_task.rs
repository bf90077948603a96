//! ``src/tasks/preview_task.rs``
//! ============================================================================
//! # Background file previews
//!
//! Produces up to `height` lines for one file, either from the configured
//! previewer process (`previewer <path> <height>`) or straight from the file.
//! Nothing here is fatal: read and spawn failures are logged and whatever was
//! read so far becomes the register.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use memchr::memchr;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, warn};

use crate::{cache::cache_manager::CacheStats, model::register::Register};

pub fn spawn_preview(
    path: PathBuf,
    height: usize,
    previewer: Option<PathBuf>,
    stats: Arc<CacheStats>,
    register_tx: UnboundedSender<Register>,
) {
    tokio::spawn(async move {
        stats.record_preview();
        debug!(path = %path.display(), height, "Loading preview");

        let register = preview(&path, height, previewer.as_deref()).await;

        if register_tx.send(register).is_err() {
            debug!("Register receiver dropped before {} finished", path.display());
        }
    });
}

/// Read the preview for `path` without touching any cache.
pub async fn preview(path: &Path, height: usize, previewer: Option<&Path>) -> Register {
    match previewer {
        Some(cmd) => preview_process(path, height, cmd).await,

        None => match File::open(path).await {
            Ok(file) => read_lines(path, BufReader::new(file), height).await,

            Err(e) => {
                warn!("opening file {}: {}", path.display(), e);
                Register::text(path, Vec::new())
            }
        },
    }
}

async fn preview_process(path: &Path, height: usize, cmd: &Path) -> Register {
    let spawned = Command::new(cmd)
        .arg(path)
        .arg(height.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,

        Err(e) => {
            warn!("starting previewer {}: {}", cmd.display(), e);
            return Register::text(path, Vec::new());
        }
    };

    let register = match child.stdout.take() {
        // The reader owns stdout and drops it once enough lines are read.
        Some(stdout) => read_lines(path, BufReader::new(stdout), height).await,
        None => Register::text(path, Vec::new()),
    };

    let cmd = cmd.to_path_buf();
    tokio::spawn(async move {
        if let Err(e) = child.wait().await {
            debug!("previewer {} did not exit cleanly: {}", cmd.display(), e);
        }
    });

    register
}

async fn read_lines<R>(path: &Path, mut reader: R, height: usize) -> Register
where
    R: AsyncBufRead + Unpin,
{
    let mut lines: Vec<String> = Vec::with_capacity(height.min(128));
    let mut buf: Vec<u8> = Vec::new();

    while lines.len() < height {
        buf.clear();

        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,

            Ok(_) => {
                if memchr(0, &buf).is_some() {
                    return Register::binary(path);
                }

                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                lines.push(String::from_utf8_lossy(&buf).into_owned());
            }

            Err(e) => {
                warn!("loading file {}: {}", path.display(), e);
                break;
            }
        }
    }

    Register::text(path, lines)
}
