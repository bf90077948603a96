//! ``src/model/listing.rs``
//! ============================================================================
//! # `Listing`: one directory snapshot with its sorted view and cursor
//!
//! `all` holds every scanned entry in directory order. `visible` is a list of
//! indices into `all` and is rebuilt from scratch on every sort, so toggling
//! the hidden filter or the sort key never compounds a previous filter.
//!
//! Cursor invariants, for a viewport of `height` rows:
//! `ind < visible.len()` (or 0 when empty) and `pos <= min(ind, height - 1)`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::config::{SortKey, SortOptions};
use crate::fs::{dir_scanner::scan_dir, object_info::FileEntry};

#[derive(Debug, Clone)]
pub struct Listing {
    /// Directory this listing describes.
    pub path: PathBuf,

    /// True while the placeholder waits for its scan.
    pub loading: bool,

    /// When the scan that produced `all` started.
    pub load_time: SystemTime,

    /// Cursor index into `visible`.
    pub ind: usize,

    /// Screen row of the cursor.
    pub pos: usize,

    /// Set when the directory could not be read.
    pub error: Option<String>,

    all: Vec<FileEntry>,

    visible: Vec<usize>,
}

impl Listing {
    /// Empty listing standing in for a scan that has not finished.
    #[must_use]
    pub fn placeholder(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            loading: true,
            load_time: UNIX_EPOCH,
            ind: 0,
            pos: 0,
            error: None,
            all: Vec::new(),
            visible: Vec::new(),
        }
    }

    /// Scan `path` synchronously. Unreadable directories give an empty listing.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let load_time = SystemTime::now();

        let (all, error) = match scan_dir(path) {
            Ok(entries) => (entries, None),

            Err(e) => {
                warn!("reading directory: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        Self::from_entries(path, all, load_time, error)
    }

    #[must_use]
    pub fn from_entries(
        path: &Path,
        all: Vec<FileEntry>,
        load_time: SystemTime,
        error: Option<String>,
    ) -> Self {
        let visible = (0..all.len()).collect();

        Self {
            path: path.to_path_buf(),
            loading: false,
            load_time,
            ind: 0,
            pos: 0,
            error,
            all,
            visible,
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Every scanned entry in directory order.
    #[must_use]
    pub fn all(&self) -> &[FileEntry] {
        &self.all
    }

    /// Entries currently shown, in display order.
    pub fn visible(&self) -> impl ExactSizeIterator<Item = &FileEntry> + DoubleEndedIterator {
        self.visible.iter().map(|&i| &self.all[i])
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.visible.get(index).map(|&i| &self.all[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Highlighted entry, if any.
    #[must_use]
    pub fn current(&self) -> Option<&FileEntry> {
        self.get(self.ind)
    }

    /// Name of the highlighted entry, or "" for an empty view.
    #[must_use]
    pub fn name(&self) -> &str {
        self.current().map_or("", FileEntry::name)
    }

    /// Add an entry to both `all` and `visible`.
    ///
    /// Used to keep a known file selectable while the real scan is in flight.
    pub fn push_entry(&mut self, entry: FileEntry) {
        self.all.push(entry);
        self.visible.push(self.all.len() - 1);
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Rebuild `visible` from `all`.
    ///
    /// Every pass is stable: key order first, then an optional reversal, then
    /// directories first, then hidden entries partitioned to the front and
    /// cut off.
    pub fn sort(&mut self, opts: &SortOptions) {
        let all = &self.all;
        let mut order: Vec<usize> = (0..all.len()).collect();

        match opts.sort_by {
            SortKey::Natural => {
                let lower: Vec<String> =
                    all.iter().map(|e| e.name.as_str().to_lowercase()).collect();
                order.sort_by(|&a, &b| -> Ordering {
                    alphanumeric_sort::compare_str(&lower[a], &lower[b])
                });
            }

            SortKey::Name => {
                let lower: Vec<String> =
                    all.iter().map(|e| e.name.as_str().to_lowercase()).collect();
                order.sort_by(|&a, &b| -> Ordering { lower[a].cmp(&lower[b]) });
            }

            SortKey::Size => {
                order.sort_by_key(|&i| all[i].size());
            }

            SortKey::Time => {
                order.sort_by_key(|&i| all[i].modified());
            }
        }

        if opts.reverse {
            order.reverse();
        }

        if opts.dir_first {
            order.sort_by_key(|&i| !all[i].is_dir());
        }

        if !opts.hidden {
            order.sort_by_key(|&i| !all[i].is_hidden());
            let first_shown = order
                .iter()
                .position(|&i| !all[i].is_hidden())
                .unwrap_or(order.len());
            order.drain(..first_shown);
        }

        self.visible = order;
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Put the cursor on `name` if it is still visible, otherwise keep the
    /// clamped index, then recompute the screen row.
    pub fn find(&mut self, name: &str, height: usize, scroll_off: usize) {
        if self.visible.is_empty() {
            self.ind = 0;
            self.pos = 0;
            return;
        }

        let len = self.visible.len();
        self.ind = self.ind.min(len - 1);

        if self.name() != name {
            let found = self.visible().position(|e| e.name() == name);
            if let Some(i) = found {
                self.ind = i;
            }
        }

        let edge = scroll_off.min(len - self.ind - 1);
        self.pos = self.ind.min(height.saturating_sub(edge + 1));
    }

    pub fn move_up(&mut self, dist: usize, height: usize, scroll_off: usize) {
        if self.ind == 0 {
            return;
        }

        self.ind = self.ind.saturating_sub(dist);

        let edge = scroll_off.min(self.ind);
        self.pos = self.pos.saturating_sub(dist).max(edge);
        self.pos = self.pos.min(height.saturating_sub(1)).min(self.ind);
    }

    pub fn move_down(&mut self, dist: usize, height: usize, scroll_off: usize) {
        let Some(max_ind) = self.visible.len().checked_sub(1) else {
            return;
        };

        if self.ind >= max_ind {
            return;
        }

        self.ind = self.ind.saturating_add(dist).min(max_ind);
        self.pos = self.pos.saturating_add(dist);

        let mut edge = scroll_off.min(max_ind - self.ind);

        // Smaller margin when the height is even and scroll_off is maxed, so
        // repeated up/down keeps the cursor on the same row.
        edge = edge.min((height / 2 + height % 2).saturating_sub(1));

        self.pos = self.pos.min(height.saturating_sub(edge + 1));
        self.pos = self.pos.min(max_ind);
    }

    pub fn top(&mut self) {
        self.ind = 0;
        self.pos = 0;
    }

    pub fn bottom(&mut self, height: usize) {
        self.ind = self.visible.len().saturating_sub(1);
        self.pos = self.ind.min(height.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::object_info::{EntryMeta, LinkState};
    use std::time::Duration;

    fn entry(name: &str, size: u64, secs: u64, is_dir: bool) -> FileEntry {
        let meta = EntryMeta {
            size,
            modified: UNIX_EPOCH + Duration::from_secs(secs),
            mode: 0o644,
            is_dir,
            is_symlink: false,
        };

        FileEntry::with_meta(&Path::new("/t").join(name), meta, LinkState::NotLink)
    }

    fn files(names: &[&str]) -> Listing {
        let all = names.iter().map(|n| entry(n, 0, 0, false)).collect();
        Listing::from_entries(Path::new("/t"), all, UNIX_EPOCH, None)
    }

    fn names(listing: &Listing) -> Vec<&str> {
        listing.visible().map(FileEntry::name).collect()
    }

    fn opts(sort_by: SortKey) -> SortOptions {
        SortOptions {
            sort_by,
            reverse: false,
            dir_first: false,
            hidden: false,
        }
    }

    #[test]
    fn test_name_sort_drops_hidden() {
        let mut listing = files(&["b.txt", "a.txt", ".hidden"]);
        listing.sort(&opts(SortKey::Name));

        assert_eq!(names(&listing), vec!["a.txt", "b.txt"]);
        assert_eq!(listing.all().len(), 3);
    }

    #[test]
    fn test_name_keys_ignore_case() {
        let mut listing = files(&["b10", "B2", "a", "C"]);

        listing.sort(&opts(SortKey::Natural));
        assert_eq!(names(&listing), vec!["a", "B2", "b10", "C"]);

        listing.sort(&opts(SortKey::Name));
        assert_eq!(names(&listing), vec!["a", "b10", "B2", "C"]);
    }

    #[test]
    fn test_hidden_filter_holds_for_every_key() {
        let all = vec![
            entry(".zz", 900, 1, false),
            entry("m", 5, 7, false),
            entry(".a", 1, 9, true),
            entry("B", 5, 3, true),
            entry("c10", 70, 2, false),
            entry(".q", 20, 5, false),
            entry("c9", 3, 8, false),
        ];

        for key in [SortKey::Natural, SortKey::Name, SortKey::Size, SortKey::Time] {
            for reverse in [false, true] {
                for dir_first in [false, true] {
                    let shown = SortOptions {
                        sort_by: key,
                        reverse,
                        dir_first,
                        hidden: true,
                    };
                    let filtered = SortOptions {
                        hidden: false,
                        ..shown.clone()
                    };

                    let mut full = Listing::from_entries(Path::new("/t"), all.clone(), UNIX_EPOCH, None);
                    full.sort(&shown);
                    let expected: Vec<&str> = names(&full)
                        .into_iter()
                        .filter(|n| !n.starts_with('.'))
                        .collect();

                    let mut listing = Listing::from_entries(Path::new("/t"), all.clone(), UNIX_EPOCH, None);
                    listing.sort(&filtered);

                    assert_eq!(names(&listing), expected, "{key} reverse={reverse} dir_first={dir_first}");
                }
            }
        }
    }

    #[test]
    fn test_toggling_hidden_recomputes_from_all() {
        let mut listing = files(&[".x", "b", "a"]);
        let mut o = opts(SortKey::Name);

        listing.sort(&o);
        listing.sort(&o);
        assert_eq!(names(&listing), vec!["a", "b"]);

        o.hidden = true;
        listing.sort(&o);
        assert_eq!(names(&listing), vec![".x", "a", "b"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut listing = files(&["img10", "img2", "IMG1", "a"]);
        let o = opts(SortKey::Natural);

        listing.sort(&o);
        let first: Vec<String> = names(&listing).iter().map(|s| s.to_string()).collect();
        listing.sort(&o);

        assert_eq!(names(&listing), first);
        assert_eq!(first, vec!["a", "IMG1", "img2", "img10"]);
    }

    #[test]
    fn test_size_ties_keep_scan_order_and_dirs_first() {
        let all = vec![
            entry("f1", 10, 0, false),
            entry("d1", 10, 0, true),
            entry("f0", 1, 0, false),
            entry("f2", 10, 0, false),
        ];
        let mut listing = Listing::from_entries(Path::new("/t"), all, UNIX_EPOCH, None);

        listing.sort(&opts(SortKey::Size));
        assert_eq!(names(&listing), vec!["f0", "f1", "d1", "f2"]);

        listing.sort(&SortOptions {
            dir_first: true,
            ..opts(SortKey::Size)
        });
        assert_eq!(names(&listing), vec!["d1", "f0", "f1", "f2"]);
    }

    #[test]
    fn test_time_sort_reversed() {
        let all = vec![
            entry("old", 0, 1, false),
            entry("new", 0, 3, false),
            entry("mid", 0, 2, false),
        ];
        let mut listing = Listing::from_entries(Path::new("/t"), all, UNIX_EPOCH, None);
        listing.sort(&SortOptions {
            reverse: true,
            ..opts(SortKey::Time)
        });

        assert_eq!(names(&listing), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_find_restores_cursor_and_clamps() {
        let mut listing = files(&["a", "b", "c", "d", "e"]);
        listing.find("d", 10, 0);
        assert_eq!((listing.ind, listing.pos), (3, 3));

        listing.ind = 40;
        listing.find("gone", 10, 0);
        assert_eq!(listing.ind, 4);
        assert!(listing.pos <= listing.ind);
    }

    #[test]
    fn test_find_respects_scroll_margin() {
        let names: Vec<String> = (0..20).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut listing = files(&refs);

        listing.find("f10", 5, 2);
        assert_eq!(listing.ind, 10);
        assert_eq!(listing.pos, 2);
    }

    #[test]
    fn test_find_on_empty_resets() {
        let mut listing = files(&[]);
        listing.ind = 3;
        listing.pos = 2;
        listing.find("x", 10, 0);
        assert_eq!((listing.ind, listing.pos), (0, 0));
    }

    #[test]
    fn test_moves_keep_cursor_in_range() {
        let names: Vec<String> = (0..30).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut listing = files(&refs);
        let height = 10;

        listing.move_down(100, height, 3);
        assert_eq!(listing.ind, 29);
        assert!(listing.pos <= height - 1);

        listing.move_up(5, height, 3);
        assert_eq!(listing.ind, 24);
        assert!(listing.pos >= 3);

        listing.move_up(100, height, 3);
        assert_eq!((listing.ind, listing.pos), (0, 0));

        for _ in 0..15 {
            listing.move_down(1, height, 3);
            assert!(listing.pos <= listing.ind.min(height - 1));
            assert!(listing.pos + 3 <= height - 1);
        }
    }

    #[test]
    fn test_down_uses_reduced_margin_on_even_height() {
        let names: Vec<String> = (0..30).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut listing = files(&refs);

        // height 4, huge scroll_off: edge capped at 4/2 + 0 - 1 = 1.
        for _ in 0..10 {
            listing.move_down(1, 4, 100);
        }
        assert_eq!(listing.pos, 2);
    }

    #[test]
    fn test_top_and_bottom() {
        let mut listing = files(&["a", "b", "c", "d", "e", "f"]);
        listing.bottom(4);
        assert_eq!((listing.ind, listing.pos), (5, 3));

        listing.top();
        assert_eq!((listing.ind, listing.pos), (0, 0));
    }

    #[test]
    fn test_pushed_entry_is_findable() {
        let mut listing = Listing::placeholder(Path::new("/t"));
        listing.push_entry(entry("target", 0, 0, false));
        listing.find("target", 10, 0);

        assert_eq!(listing.name(), "target");
    }
}
