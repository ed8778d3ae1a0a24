//! Bookmarked offsets.
//!
//! A sorted set of byte offsets, independent of the patch overlay and the
//! annotation store. Bookmarks carry no payload and are created and removed
//! by explicit user action only; they are persisted per file but never
//! history-tracked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A sorted set of bookmarked offsets for one open file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet {
    offsets: BTreeSet<usize>,
}

impl BookmarkSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from persisted offsets.
    pub fn from_offsets(offsets: impl IntoIterator<Item = usize>) -> Self {
        Self {
            offsets: offsets.into_iter().collect(),
        }
    }

    /// Add a bookmark. Returns `false` when the offset was already marked.
    pub fn add(&mut self, offset: usize) -> bool {
        self.offsets.insert(offset)
    }

    /// Remove a bookmark. Returns `false` when the offset was not marked.
    pub fn remove(&mut self, offset: usize) -> bool {
        self.offsets.remove(&offset)
    }

    /// Whether `offset` is bookmarked.
    pub fn contains(&self, offset: usize) -> bool {
        self.offsets.contains(&offset)
    }

    /// Number of bookmarks.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether no offset is bookmarked.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Bookmarked offsets, ascending.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.offsets.iter().copied()
    }
}
