//! ``src/tasks/dir_load_task.rs``
//! ============================================================================
//! # Background directory loads
//!
//! Scans run on the blocking pool. Each worker sends exactly one update back
//! to the owner: a finished, sorted `Listing`, or `Unchanged` when a refresh
//! finds nothing to reload. Either one ends the path's load.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::{cache::cache_manager::CacheStats, config::SortOptions, model::listing::Listing};

/// One worker's result for one directory.
#[derive(Debug)]
pub enum ListingUpdate {
    Loaded(Listing),
    Unchanged(PathBuf),
}

impl ListingUpdate {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Loaded(listing) => &listing.path,
            Self::Unchanged(path) => path,
        }
    }
}

/// Spawn a scan of `path` followed by the initial sort.
pub fn spawn_listing_load(
    path: PathBuf,
    opts: SortOptions,
    stats: Arc<CacheStats>,
    listing_tx: UnboundedSender<ListingUpdate>,
) {
    tokio::task::spawn_blocking(move || {
        let listing = load_sorted(&path, &opts, &stats);
        send(&listing_tx, ListingUpdate::Loaded(listing));
    });
}

/// Spawn a reload of `path` that only scans when the directory's mtime is not
/// older than `load_time`.
pub fn spawn_listing_refresh(
    path: PathBuf,
    load_time: SystemTime,
    opts: SortOptions,
    stats: Arc<CacheStats>,
    listing_tx: UnboundedSender<ListingUpdate>,
) {
    tokio::task::spawn_blocking(move || {
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,

            Err(e) => {
                info!("getting directory info of {}: {}", path.display(), e);
                send(&listing_tx, ListingUpdate::Unchanged(path));
                return;
            }
        };

        if load_time > modified {
            debug!(path = %path.display(), "Directory unchanged since last load");
            send(&listing_tx, ListingUpdate::Unchanged(path));
            return;
        }

        let listing = load_sorted(&path, &opts, &stats);
        send(&listing_tx, ListingUpdate::Loaded(listing));
    });
}

fn send(listing_tx: &UnboundedSender<ListingUpdate>, update: ListingUpdate) {
    if let Err(e) = listing_tx.send(update) {
        debug!("Listing receiver dropped before {} finished", e.0.path().display());
    }
}

fn load_sorted(path: &Path, opts: &SortOptions, stats: &CacheStats) -> Listing {
    stats.record_scan();
    debug!(path = %path.display(), "Scanning directory");

    let mut listing = Listing::load(path);
    listing.sort(opts);
    listing
}
