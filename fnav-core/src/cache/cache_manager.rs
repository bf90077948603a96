//! `src/cache/cache_manager.rs`
//! ============================================================================
//! # Listing and Register caches
//!
//! Owned by the navigator and only ever touched from its thread. A cache miss
//! inserts a loading placeholder *before* the worker is spawned: that
//! insertion is what guarantees a path never has two loads in flight, since
//! every later request finds the placeholder and returns it as is. Refreshes
//! of loaded listings are tracked in a set for the same reason, and neither
//! kind of in-flight entry is ever evicted.
//!
//! Workers report back over one unbounded channel per result kind. Statistics
//! are atomics so workers can record scans without touching the maps.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::{AHashMap, AHashSet};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::{
    config::SortOptions,
    model::{listing::Listing, register::Register},
    tasks::{
        dir_load_task::{ListingUpdate, spawn_listing_load, spawn_listing_refresh},
        preview_task::spawn_preview,
    },
};

/// Cache statistics for monitoring and tests
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    scans: AtomicU64,
    previews: AtomicU64,
    merges: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Called by a worker right before it reads a directory.
    pub fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preview(&self) {
        self.previews.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            previews: self.previews.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub scans: u64,
    pub previews: u64,
    pub merges: u64,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Receiving ends of the worker channels, drained by the owner.
#[derive(Debug)]
pub struct LoadReceivers {
    pub listings: UnboundedReceiver<ListingUpdate>,
    pub registers: UnboundedReceiver<Register>,
}

#[derive(Debug)]
pub struct CacheManager {
    listings: AHashMap<PathBuf, Listing>,
    registers: AHashMap<PathBuf, Register>,
    refreshing: AHashSet<PathBuf>,
    stats: Arc<CacheStats>,
    listing_tx: UnboundedSender<ListingUpdate>,
    register_tx: UnboundedSender<Register>,
}

impl CacheManager {
    #[must_use]
    pub fn new() -> (Self, LoadReceivers) {
        let (listing_tx, listings) = mpsc::unbounded_channel();
        let (register_tx, registers) = mpsc::unbounded_channel();

        let manager = Self {
            listings: AHashMap::new(),
            registers: AHashMap::new(),
            refreshing: AHashSet::new(),
            stats: Arc::new(CacheStats::default()),
            listing_tx,
            register_tx,
        };

        (manager, LoadReceivers { listings, registers })
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// Cached listing for `path`, or a fresh placeholder with a scan spawned.
    pub fn request_listing(&mut self, path: &Path, opts: &SortOptions) -> &mut Listing {
        if self.listings.contains_key(path) {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
            self.listings
                .insert(path.to_path_buf(), Listing::placeholder(path));

            debug!(path = %path.display(), "Spawning directory load");
            spawn_listing_load(
                path.to_path_buf(),
                opts.clone(),
                self.stats.clone(),
                self.listing_tx.clone(),
            );
        }

        self.listings
            .entry(path.to_path_buf())
            .or_insert_with(|| Listing::placeholder(path))
    }

    /// Reload `path` in the background if the directory changed since the
    /// cached scan. Nothing is spawned while a load or refresh of `path` is
    /// still in flight.
    pub fn refresh_listing(&mut self, path: &Path, opts: &SortOptions) {
        let Some(listing) = self.listings.get(path) else {
            return;
        };

        if listing.loading || self.refreshing.contains(path) {
            return;
        }

        self.refreshing.insert(path.to_path_buf());
        spawn_listing_refresh(
            path.to_path_buf(),
            listing.load_time,
            opts.clone(),
            self.stats.clone(),
            self.listing_tx.clone(),
        );
    }

    #[must_use]
    pub fn listing(&self, path: &Path) -> Option<&Listing> {
        self.listings.get(path)
    }

    pub fn listing_mut(&mut self, path: &Path) -> Option<&mut Listing> {
        self.listings.get_mut(path)
    }

    /// Store a finished listing, returning the entry it replaces.
    pub fn insert_listing(&mut self, listing: Listing) -> Option<Listing> {
        self.stats.record_merge();
        self.refreshing.remove(&listing.path);
        self.listings.insert(listing.path.clone(), listing)
    }

    /// A refresh found nothing to reload.
    pub fn finish_refresh(&mut self, path: &Path) {
        self.refreshing.remove(path);
    }

    pub fn listings_mut(&mut self) -> impl Iterator<Item = &mut Listing> {
        self.listings.values_mut()
    }

    /// Evict every settled listing whose path fails `keep`. Listings with a
    /// load or refresh in flight stay.
    pub fn retain_listings(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        let refreshing = &self.refreshing;
        self.listings
            .retain(|path, listing| listing.loading || refreshing.contains(path) || keep(path));
    }

    // ------------------------------------------------------------------
    // Registers
    // ------------------------------------------------------------------

    /// Cached preview for `path`, or a loading placeholder with a preview spawned.
    pub fn request_register(
        &mut self,
        path: &Path,
        height: usize,
        previewer: Option<&Path>,
    ) -> &Register {
        if !self.registers.contains_key(path) {
            self.registers
                .insert(path.to_path_buf(), Register::loading(path));

            spawn_preview(
                path.to_path_buf(),
                height,
                previewer.map(Path::to_path_buf),
                self.stats.clone(),
                self.register_tx.clone(),
            );
        }

        self.registers
            .entry(path.to_path_buf())
            .or_insert_with(|| Register::loading(path))
    }

    #[must_use]
    pub fn register(&self, path: &Path) -> Option<&Register> {
        self.registers.get(path)
    }

    pub fn insert_register(&mut self, register: Register) {
        self.stats.record_merge();
        self.registers.insert(register.path.clone(), register);
    }

    /// Drop both maps. In-flight loads still deliver and repopulate entries.
    pub fn clear(&mut self) {
        self.listings.clear();
        self.registers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    async fn loaded(rx: &mut LoadReceivers) -> Listing {
        match rx.listings.recv().await {
            Some(ListingUpdate::Loaded(listing)) => listing,
            other => panic!("unexpected update: {other:?}"),
        }
    }

    /// Load `dir` and cache it as if it were scanned before any change.
    async fn cached_stale(cache: &mut CacheManager, rx: &mut LoadReceivers, dir: &Path) {
        cache.request_listing(dir, &SortOptions::default());
        let mut listing = loaded(rx).await;
        listing.load_time = UNIX_EPOCH;
        cache.insert_listing(listing);
    }

    #[tokio::test]
    async fn test_two_requests_spawn_one_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        assert!(cache.request_listing(dir.path(), &opts).loading);
        assert!(cache.request_listing(dir.path(), &opts).loading);

        let listing = loaded(&mut rx).await;
        assert_eq!(listing.path, dir.path());
        assert!(!listing.loading);
        assert_eq!(listing.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.listings.try_recv().is_err());

        let stats = cache.stats();
        assert_eq!(stats.scans, 1);
        assert_eq!((stats.misses, stats.hits), (1, 1));
    }

    #[tokio::test]
    async fn test_refresh_skips_unchanged_directory() {
        let dir = TempDir::new().unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        cache.request_listing(dir.path(), &opts);
        let listing = loaded(&mut rx).await;
        cache.insert_listing(listing);

        cache.refresh_listing(dir.path(), &opts);

        match rx.listings.recv().await {
            Some(ListingUpdate::Unchanged(path)) => cache.finish_refresh(&path),
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(cache.stats().scans, 1);
    }

    #[tokio::test]
    async fn test_refresh_reloads_changed_directory() {
        let dir = TempDir::new().unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        cached_stale(&mut cache, &mut rx, dir.path()).await;

        std::fs::write(dir.path().join("new"), b"").unwrap();
        cache.refresh_listing(dir.path(), &opts);

        let reloaded = loaded(&mut rx).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(cache.stats().scans, 2);
    }

    #[tokio::test]
    async fn test_refresh_never_doubles_an_in_flight_load() {
        let dir = TempDir::new().unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        cache.request_listing(dir.path(), &opts);
        cache.refresh_listing(dir.path(), &opts);

        loaded(&mut rx).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.listings.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_back_to_back_refreshes_scan_once() {
        let dir = TempDir::new().unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        cached_stale(&mut cache, &mut rx, dir.path()).await;
        std::fs::write(dir.path().join("new"), b"").unwrap();

        cache.refresh_listing(dir.path(), &opts);
        cache.refresh_listing(dir.path(), &opts);

        let mut reloaded = loaded(&mut rx).await;
        assert_eq!(reloaded.len(), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.listings.try_recv().is_err());
        assert_eq!(cache.stats().scans, 2);

        // Merging ends the refresh, so a later change is picked up again.
        reloaded.load_time = UNIX_EPOCH;
        cache.insert_listing(reloaded);
        cache.refresh_listing(dir.path(), &opts);
        assert_eq!(loaded(&mut rx).await.len(), 1);
        assert_eq!(cache.stats().scans, 3);
    }

    #[tokio::test]
    async fn test_eviction_keeps_in_flight_listings() {
        let settled = TempDir::new().unwrap();
        let pending = TempDir::new().unwrap();
        let refreshing = TempDir::new().unwrap();
        let (mut cache, mut rx) = CacheManager::new();
        let opts = SortOptions::default();

        cache.request_listing(settled.path(), &opts);
        let listing = loaded(&mut rx).await;
        cache.insert_listing(listing);

        cached_stale(&mut cache, &mut rx, refreshing.path()).await;
        cache.refresh_listing(refreshing.path(), &opts);

        cache.request_listing(pending.path(), &opts);
        cache.retain_listings(|_| false);

        assert!(cache.listing(settled.path()).is_none());
        assert!(cache.listing(pending.path()).is_some_and(|l| l.loading));
        assert!(cache.listing(refreshing.path()).is_some());

        // Asking again while the load is out spawns nothing new.
        cache.request_listing(pending.path(), &opts);
        for _ in 0..2 {
            rx.listings.recv().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.listings.try_recv().is_err());
        assert_eq!(cache.stats().scans, 4);
    }
}
