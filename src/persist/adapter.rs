//! Per-file persistence adapter.
//!
//! `FilePersistence` namespaces one open file's state inside a shared
//! key-value store: `r2-patches-<file>`, `r2-annotations-<file>`,
//! `r2-bookmarks-<file>`, `r2-hex-layout-<file>-columns` / `-word`, and
//! `r2-snapshots-<file>`. Different open files own disjoint namespaces, so
//! concurrent sessions never collide.
//!
//! Every operation is best-effort: loads fall back to empty state and saves
//! are fire-and-forget, with failures logged rather than surfaced.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{Address, Annotation, Patch};
use crate::editor::snapshot::Snapshot;
use crate::persist::KeyValueStore;

/// Display grouping persisted alongside the core state.
///
/// Not part of the engine's invariants; kept because the original surface
/// stores it in the same namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub columns: u32,
    pub word: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 16,
            word: 1,
        }
    }
}

/// Namespaced persistence for one open file.
#[derive(Clone)]
pub struct FilePersistence {
    store: Arc<dyn KeyValueStore>,
    file: String,
}

impl FilePersistence {
    /// Bind `file`'s namespace over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, file: impl Into<String>) -> Self {
        let file = file.into();
        let file = if file.is_empty() {
            "default".to_string()
        } else {
            file
        };
        Self { store, file }
    }

    /// The file identifier this adapter is bound to.
    pub fn file(&self) -> &str {
        &self.file
    }

    fn patches_key(&self) -> String {
        format!("r2-patches-{}", self.file)
    }

    fn annotations_key(&self) -> String {
        format!("r2-annotations-{}", self.file)
    }

    fn bookmarks_key(&self) -> String {
        format!("r2-bookmarks-{}", self.file)
    }

    fn layout_key(&self, suffix: &str) -> String {
        format!("r2-hex-layout-{}-{}", self.file, suffix)
    }

    fn snapshots_key(&self) -> String {
        format!("r2-snapshots-{}", self.file)
    }

    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(err) => {
                warn!(key, error = %err, "persistence read failed; using empty state");
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "persisted value is corrupt; using empty state");
                T::default()
            }
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "failed to serialize persisted value");
                return;
            }
        };
        if let Err(err) = self.store.set(key, &raw) {
            warn!(key, error = %err, "persistence write failed; will retry on next save");
        }
    }

    /// Persisted patch list, empty on any failure.
    pub fn load_patches(&self) -> Vec<Patch> {
        self.load_json(&self.patches_key())
    }

    /// Persist the patch list (fire-and-forget).
    pub fn save_patches(&self, patches: &[Patch]) {
        self.save_json(&self.patches_key(), &patches);
    }

    /// Persisted annotations, empty on any failure.
    pub fn load_annotations(&self) -> BTreeMap<Address, Annotation> {
        self.load_json(&self.annotations_key())
    }

    /// Persist the annotation map (fire-and-forget).
    pub fn save_annotations(&self, annotations: &BTreeMap<Address, Annotation>) {
        self.save_json(&self.annotations_key(), annotations);
    }

    /// Persisted bookmark offsets, empty on any failure.
    pub fn load_bookmarks(&self) -> Vec<usize> {
        self.load_json(&self.bookmarks_key())
    }

    /// Persist the bookmark offsets (fire-and-forget).
    pub fn save_bookmarks(&self, offsets: &[usize]) {
        self.save_json(&self.bookmarks_key(), &offsets);
    }

    /// Persisted layout, defaults for missing or invalid values.
    pub fn load_layout(&self) -> LayoutConfig {
        let mut layout = LayoutConfig::default();
        if let Some(columns) = self.load_plain_u32("columns") {
            layout.columns = columns;
        }
        if let Some(word) = self.load_plain_u32("word") {
            layout.word = word;
        }
        layout
    }

    fn load_plain_u32(&self, suffix: &str) -> Option<u32> {
        let key = self.layout_key(suffix);
        let raw = self.store.get(&key).ok().flatten()?;
        match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => Some(value),
            _ => {
                debug!(key, raw, "ignoring invalid persisted layout value");
                None
            }
        }
    }

    /// Persist the layout as plain integers (fire-and-forget).
    pub fn save_layout(&self, layout: LayoutConfig) {
        for (suffix, value) in [("columns", layout.columns), ("word", layout.word)] {
            let key = self.layout_key(suffix);
            if let Err(err) = self.store.set(&key, &value.to_string()) {
                warn!(key, error = %err, "persistence write failed");
            }
        }
    }

    /// Persisted snapshots; mangled entries are dropped with a warning.
    pub fn load_snapshots(&self) -> Vec<Snapshot> {
        let snapshots: Vec<Snapshot> = self.load_json(&self.snapshots_key());
        snapshots
            .into_iter()
            .filter(|snapshot| {
                let ok = snapshot.is_well_formed();
                if !ok {
                    warn!(id = %snapshot.id, "dropping malformed persisted snapshot");
                }
                ok
            })
            .collect()
    }

    /// Persist the snapshot list (fire-and-forget).
    pub fn save_snapshots(&self, snapshots: &[Snapshot]) {
        self.save_json(&self.snapshots_key(), &snapshots);
    }
}

impl std::fmt::Debug for FilePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePersistence")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}
