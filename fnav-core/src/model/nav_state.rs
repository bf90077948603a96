//! ``src/model/nav_state.rs``
//! ============================================================================
//! # `Navigator`: the directory stack and everything the user does with it
//!
//! `dirs[0]` is the outermost ancestor, the last element is the current
//! directory. Levels are paths into the listing cache, so a cursor moved on
//! a cached listing is the same cursor the stack sees.
//!
//! The navigator is the only owner of its stack, caches and marks. Loads run
//! on background workers; their results come back through `next_event` or
//! `drain_pending`, which merge them in arrival order. The process working
//! directory changes in the same call as the stack.

use std::{
    env,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use ahash::AHashMap;
use clipr::{ClipboardOperation, PendingOperation, PendingStore};
use directories::UserDirs;
use tracing::{debug, info};

use crate::{
    cache::cache_manager::{CacheManager, CacheStatsSnapshot, LoadReceivers},
    config::{NavConfig, SortOptions},
    error::AppError,
    fs::object_info::FileEntry,
    model::{listing::Listing, marks::MarkSet, register::Register},
    search::matcher::Matcher,
    tasks::{dir_load_task::ListingUpdate, file_ops_task::Transfer},
};

/// What a merged worker result changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    ListingLoaded(PathBuf),
    RegisterLoaded(PathBuf),
}

/// Content to show for the highlighted entry.
#[derive(Debug)]
pub enum Preview<'a> {
    Listing(&'a Listing),
    Register(&'a Register),
}

enum Delivery {
    Listing(ListingUpdate),
    Register(Register),
}

pub struct Navigator {
    dirs: Vec<PathBuf>,
    cache: CacheManager,
    receivers: LoadReceivers,
    height: usize,
    config: NavConfig,
    marks: MarkSet,
    saves: AHashMap<PathBuf, ClipboardOperation>,
    search: String,
    store: Arc<dyn PendingStore>,
    transfer: Arc<dyn Transfer>,
}

impl Navigator {
    /// Build the stack for the process working directory.
    ///
    /// Must be called inside a tokio runtime: every level not yet cached
    /// spawns its scan immediately.
    pub fn new(
        config: NavConfig,
        height: usize,
        store: Arc<dyn PendingStore>,
        transfer: Arc<dyn Transfer>,
    ) -> Result<Self, AppError> {
        let wd = env::current_dir()?;
        let (cache, receivers) = CacheManager::new();

        let mut nav = Self {
            dirs: Vec::new(),
            cache,
            receivers,
            height,
            config,
            marks: MarkSet::new(),
            saves: AHashMap::new(),
            search: String::new(),
            store,
            transfer,
        };

        nav.rebuild(&wd);
        Ok(nav)
    }

    // ------------------------------------------------------------------
    // Stack construction and worker results
    // ------------------------------------------------------------------

    fn rebuild(&mut self, wd: &Path) {
        let (height, scroll_off) = (self.height, self.config.scroll_off);
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut child: String = String::new();

        for level in wd.ancestors() {
            let listing = self.cache.request_listing(level, &self.config.sort);
            listing.find(&child, height, scroll_off);

            dirs.push(level.to_path_buf());
            child = level
                .file_name()
                .map(|b| b.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        dirs.reverse();
        debug!(wd = %wd.display(), levels = dirs.len(), "Rebuilt directory stack");
        self.dirs = dirs;
    }

    /// Cached listing for `path`, spawning its load on a miss.
    pub fn request_listing(&mut self, path: &Path) -> &Listing {
        self.cache.request_listing(path, &self.config.sort)
    }

    /// Wait for the next worker result that changes something and merge it.
    pub async fn next_event(&mut self) -> Option<NavEvent> {
        loop {
            let delivery = tokio::select! {
                Some(update) = self.receivers.listings.recv() => Delivery::Listing(update),
                Some(register) = self.receivers.registers.recv() => Delivery::Register(register),
                else => return None,
            };

            if let Some(event) = self.merge(delivery) {
                return Some(event);
            }
        }
    }

    /// Merge every result already waiting, without blocking.
    pub fn drain_pending(&mut self) -> Vec<NavEvent> {
        let mut events = Vec::new();

        while let Ok(update) = self.receivers.listings.try_recv() {
            events.extend(self.merge(Delivery::Listing(update)));
        }

        while let Ok(register) = self.receivers.registers.try_recv() {
            events.extend(self.merge(Delivery::Register(register)));
        }

        events
    }

    /// `None` when a refresh found its directory unchanged.
    fn merge(&mut self, delivery: Delivery) -> Option<NavEvent> {
        match delivery {
            Delivery::Listing(ListingUpdate::Loaded(listing)) => {
                let path = listing.path.clone();
                self.merge_listing(listing);
                Some(NavEvent::ListingLoaded(path))
            }

            Delivery::Listing(ListingUpdate::Unchanged(path)) => {
                self.cache.finish_refresh(&path);
                None
            }

            Delivery::Register(register) => {
                let path = register.path.clone();
                self.cache.insert_register(register);
                Some(NavEvent::RegisterLoaded(path))
            }
        }
    }

    fn merge_listing(&mut self, mut listing: Listing) {
        if let Some(prev) = self.cache.listing(&listing.path) {
            let name = prev.name().to_owned();
            listing.ind = prev.ind;
            listing.find(&name, self.height, self.config.scroll_off);
        }

        let on_stack = self.dirs.contains(&listing.path);
        debug!(path = %listing.path.display(), on_stack, "Merging listing");

        self.cache.insert_listing(listing);

        if on_stack {
            self.position();
        }
    }

    /// Point every ancestor's cursor at the level below it.
    pub fn position(&mut self) {
        let (height, scroll_off) = (self.height, self.config.scroll_off);

        for i in (0..self.dirs.len().saturating_sub(1)).rev() {
            let Some(base) = self.dirs[i + 1].file_name() else {
                continue;
            };
            let base = base.to_string_lossy();

            if let Some(listing) = self.cache.listing_mut(&self.dirs[i]) {
                listing.find(&base, height, scroll_off);
            }
        }
    }

    /// Re-stat the stack in the background and reload what changed.
    ///
    /// Settled listings off the stack are evicted and marks on vanished paths
    /// dropped.
    pub fn refresh(&mut self, height: usize) {
        let dirs = &self.dirs;
        self.cache.retain_listings(|path| dirs.iter().any(|d| d == path));
        self.height = height;

        for dir in &self.dirs {
            self.cache.refresh_listing(dir, &self.config.sort);
        }

        self.marks.retain(Path::exists);
    }

    /// Drop every cache and rebuild from the process working directory.
    pub fn reload(&mut self) -> Result<(), AppError> {
        let highlighted = self.current_file().ok().cloned();

        self.cache.clear();
        let wd = env::current_dir()?;
        self.rebuild(&wd);

        // Keeps the cursor on the same file once the real scan lands.
        if let Some(entry) = highlighted
            && let Some(listing) = self.current_listing_mut()
        {
            listing.push_entry(entry);
        }

        Ok(())
    }

    /// Re-sort every level, keeping each highlighted name.
    pub fn sort(&mut self) {
        let (height, scroll_off) = (self.height, self.config.scroll_off);

        for dir in &self.dirs {
            if let Some(listing) = self.cache.listing_mut(dir) {
                let name = listing.name().to_owned();
                listing.sort(&self.config.sort);
                listing.find(&name, height, scroll_off);
            }
        }
    }

    pub fn set_sort_options(&mut self, opts: SortOptions) {
        self.config.sort = opts;
        self.sort();
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        let scroll_off = self.config.scroll_off;

        for listing in self.cache.listings_mut() {
            let name = listing.name().to_owned();
            listing.find(&name, height, scroll_off);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub fn current_dir(&self) -> &Path {
        self.dirs.last().map_or(Path::new(""), PathBuf::as_path)
    }

    #[must_use]
    pub fn current_listing(&self) -> Option<&Listing> {
        self.cache.listing(self.current_dir())
    }

    fn current_listing_mut(&mut self) -> Option<&mut Listing> {
        let dir = self.dirs.last()?;
        self.cache.listing_mut(dir)
    }

    /// Highlighted entry of the current directory.
    pub fn current_file(&self) -> Result<&FileEntry, AppError> {
        self.current_listing()
            .and_then(Listing::current)
            .ok_or(AppError::EmptyDirectory)
    }

    /// Listings on the stack, outermost first.
    pub fn dirs(&self) -> impl Iterator<Item = &Listing> {
        self.dirs.iter().filter_map(|d| self.cache.listing(d))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.dirs.len()
    }

    /// True while any level of the stack waits for its scan.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.dirs
            .iter()
            .any(|d| self.cache.listing(d).is_none_or(|l| l.loading))
    }

    #[must_use]
    pub fn listing(&self, path: &Path) -> Option<&Listing> {
        self.cache.listing(path)
    }

    #[must_use]
    pub fn register(&self, path: &Path) -> Option<&Register> {
        self.cache.register(path)
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn config(&self) -> &NavConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Listing for a highlighted directory, register for anything else.
    pub fn preview(&mut self) -> Result<Preview<'_>, AppError> {
        let entry = self.current_file()?;
        let (path, is_dir) = (entry.path.clone(), entry.is_dir());

        if is_dir {
            Ok(Preview::Listing(
                self.cache.request_listing(&path, &self.config.sort),
            ))
        } else {
            Ok(Preview::Register(self.cache.request_register(
                &path,
                self.height,
                self.config.previewer.as_deref(),
            )))
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Negative distances move up.
    pub fn move_by(&mut self, dist: isize) {
        let (height, scroll_off) = (self.height, self.config.scroll_off);
        let Some(listing) = self.current_listing_mut() else {
            return;
        };

        if dist < 0 {
            listing.move_up(dist.unsigned_abs(), height, scroll_off);
        } else if dist > 0 {
            listing.move_down(dist.unsigned_abs(), height, scroll_off);
        }
    }

    pub fn up(&mut self, dist: usize) {
        self.move_by(-isize::try_from(dist).unwrap_or(isize::MAX));
    }

    pub fn down(&mut self, dist: usize) {
        self.move_by(isize::try_from(dist).unwrap_or(isize::MAX));
    }

    pub fn top(&mut self) {
        if let Some(listing) = self.current_listing_mut() {
            listing.top();
        }
    }

    pub fn bottom(&mut self) {
        let height = self.height;
        if let Some(listing) = self.current_listing_mut() {
            listing.bottom(height);
        }
    }

    // ------------------------------------------------------------------
    // Directory changes
    // ------------------------------------------------------------------

    /// Enter the highlighted directory.
    pub fn open(&mut self) -> Result<(), AppError> {
        let entry = self.current_file()?;
        if !entry.is_dir() {
            return Err(AppError::NotADirectory(entry.path.clone()));
        }

        let path = entry.path.clone();
        env::set_current_dir(&path).map_err(|e| AppError::navigation_failed(&path, e.to_string()))?;

        self.cache.request_listing(&path, &self.config.sort);
        info!("Entered directory: {}", path.display());
        self.dirs.push(path);

        Ok(())
    }

    /// Leave the current directory. Does nothing at the outermost level.
    pub fn updir(&mut self) -> Result<(), AppError> {
        if self.dirs.len() <= 1 {
            return Ok(());
        }

        let parent = self.dirs[self.dirs.len() - 2].clone();
        env::set_current_dir(&parent)
            .map_err(|e| AppError::navigation_failed(&parent, e.to_string()))?;

        self.dirs.pop();
        info!("Returned to directory: {}", parent.display());

        Ok(())
    }

    /// Change to `path` (`~` expanded, relative to the current directory).
    pub fn cd(&mut self, path: &Path) -> Result<(), AppError> {
        let target = self.resolve(path);

        env::set_current_dir(&target)
            .map_err(|e| AppError::navigation_failed(&target, e.to_string()))?;

        self.rebuild(&target);
        info!("Changed directory: {}", target.display());

        Ok(())
    }

    /// Change to the parent of `path` and highlight `path` in it.
    pub fn select_path(&mut self, path: &Path) -> Result<(), AppError> {
        let target = self.resolve(path);

        let entry = FileEntry::from_path_sync(&target).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotFound(target.clone()),
            _ => AppError::navigation_failed(&target, e.to_string()),
        })?;

        let Some(parent) = target.parent() else {
            return self.cd(&target);
        };
        self.cd(parent)?;

        let (height, scroll_off) = (self.height, self.config.scroll_off);
        if let Some(listing) = self.current_listing_mut() {
            let name = entry.name.clone();
            if listing.loading {
                listing.push_entry(entry);
            }
            listing.find(&name, height, scroll_off);
        }

        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let expanded = match path.strip_prefix("~") {
            Ok(rest) => UserDirs::new().map_or_else(|| path.to_path_buf(), |u| u.home_dir().join(rest)),
            Err(_) => path.to_path_buf(),
        };

        if expanded.is_relative() {
            normalize(&self.current_dir().join(expanded))
        } else {
            normalize(&expanded)
        }
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn set_search(&mut self, pattern: impl Into<String>) {
        self.search = pattern.into();
    }

    #[must_use]
    pub fn search_pattern(&self) -> &str {
        &self.search
    }

    /// Move to the next visible entry matching the search pattern.
    pub fn search_next(&mut self) -> Result<(), AppError> {
        let matcher = Matcher::new(&self.search, &self.config.search)?;
        let wrap = self.config.search.wrap_scan;

        let Some(listing) = self.current_listing() else {
            return Ok(());
        };
        let ind = listing.ind;

        let found = listing
            .visible()
            .skip(ind + 1)
            .position(|e| matcher.is_match(e.name()))
            .map(|k| ind + 1 + k)
            .or_else(|| {
                if wrap {
                    listing.visible().take(ind).position(|e| matcher.is_match(e.name()))
                } else {
                    None
                }
            });

        self.step_to(ind, found);
        Ok(())
    }

    /// Move to the previous visible entry matching the search pattern.
    pub fn search_prev(&mut self) -> Result<(), AppError> {
        let matcher = Matcher::new(&self.search, &self.config.search)?;
        let wrap = self.config.search.wrap_scan;

        let Some(listing) = self.current_listing() else {
            return Ok(());
        };
        let ind = listing.ind;

        let found = listing
            .visible()
            .take(ind)
            .rposition(|e| matcher.is_match(e.name()))
            .or_else(|| {
                if wrap {
                    listing
                        .visible()
                        .skip(ind + 1)
                        .rposition(|e| matcher.is_match(e.name()))
                        .map(|k| ind + 1 + k)
                } else {
                    None
                }
            });

        self.step_to(ind, found);
        Ok(())
    }

    // Cursor moves go through up/down so the scroll margin is kept.
    fn step_to(&mut self, from: usize, to: Option<usize>) {
        match to {
            Some(i) if i > from => self.down(i - from),
            Some(i) if i < from => self.up(from - i),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Marks
    // ------------------------------------------------------------------

    pub fn toggle_mark(&mut self, path: &Path) {
        self.marks.toggle(path);
    }

    /// Toggle the highlighted file and step down one row.
    pub fn toggle(&mut self) -> Result<(), AppError> {
        let path = self.current_file()?.path.clone();
        self.marks.toggle(&path);
        self.down(1);

        Ok(())
    }

    /// Toggle every visible entry of the current directory.
    pub fn invert_all(&mut self) {
        let Some(listing) = self.cache.listing(self.current_dir()) else {
            return;
        };

        for entry in listing.visible() {
            self.marks.toggle(&entry.path);
        }
    }

    pub fn unmark(&mut self) {
        self.marks.clear();
    }

    #[must_use]
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// Marked paths in the order they were marked.
    #[must_use]
    pub fn ordered_marks(&self) -> Vec<PathBuf> {
        self.marks.ordered()
    }

    // ------------------------------------------------------------------
    // Pending operation
    // ------------------------------------------------------------------

    /// Queue the marks, or the highlighted file when nothing is marked,
    /// replacing whatever was queued before.
    pub async fn snapshot(&mut self, copy: bool) -> Result<(), AppError> {
        let paths = if self.marks.is_empty() {
            let file = self.current_file().map_err(|_| AppError::NoFileSelected)?;
            vec![file.path.clone()]
        } else {
            self.marks.ordered()
        };

        let operation = ClipboardOperation::from_copy_flag(copy);
        let record = PendingOperation::new(paths, operation);
        self.store.save(&record).await?;

        debug!(operation = %operation, count = record.len(), "Saved pending operation");
        self.saves = record.paths.into_iter().map(|p| (p, operation)).collect();

        Ok(())
    }

    /// Run the queued operation into the current directory.
    ///
    /// The store is cleared only after the transfer succeeds.
    pub async fn commit(&mut self) -> Result<(), AppError> {
        let record = self.store.load().await?;
        if record.is_empty() {
            return Err(AppError::EmptyBuffer);
        }

        let dest = self.current_dir().to_path_buf();
        self.transfer
            .transfer(&record.paths, &dest, record.operation)
            .await?;

        self.store.clear().await?;
        self.saves.clear();

        info!(
            operation = %record.operation,
            count = record.len(),
            dest = %dest.display(),
            "Committed pending operation"
        );

        Ok(())
    }

    /// Reload the local view of the queue from the store.
    pub async fn reconcile(&mut self) -> Result<(), AppError> {
        let record = self.store.load().await?;
        let operation = record.operation;

        self.saves = record.paths.into_iter().map(|p| (p, operation)).collect();
        Ok(())
    }

    /// Queued operation for `path`, as last seen in the store.
    #[must_use]
    pub fn saved(&self, path: &Path) -> Option<ClipboardOperation> {
        self.saves.get(path).copied()
    }
}

/// Lexically drop `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}
