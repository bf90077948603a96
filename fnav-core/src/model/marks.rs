//! ``src/model/marks.rs``
//!
//! Multi-file selection. Each mark remembers when it was toggled on so batch
//! operations can process files in the order the user picked them, whatever
//! the hash map iteration order.

use std::path::{Path, PathBuf};

use ahash::AHashMap;

#[derive(Debug, Clone, Default)]
pub struct MarkSet {
    marks: AHashMap<PathBuf, u64>,
    next: u64,
}

impl MarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` with the next sequence number, or remove it if present.
    pub fn toggle(&mut self, path: &Path) {
        if self.marks.remove(path).is_some() {
            if self.marks.is_empty() {
                self.next = 0;
            }
        } else {
            self.marks.insert(path.to_path_buf(), self.next);
            self.next += 1;
        }
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.marks.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Next sequence number to be handed out.
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.next
    }

    pub fn clear(&mut self) {
        self.marks.clear();
        self.next = 0;
    }

    /// Drop marks for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        self.marks.retain(|path, _| keep(path));
        if self.marks.is_empty() {
            self.next = 0;
        }
    }

    /// Marked paths in toggle order.
    #[must_use]
    pub fn ordered(&self) -> Vec<PathBuf> {
        let mut indexed: Vec<(&PathBuf, u64)> = self.marks.iter().map(|(p, &i)| (p, i)).collect();
        indexed.sort_unstable_by_key(|&(_, i)| i);

        indexed.into_iter().map(|(p, _)| p.clone()).collect()
    }
}
