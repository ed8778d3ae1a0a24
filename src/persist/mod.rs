//! Key-value persistence boundary.
//!
//! The engine persists per-file state (patches, annotations, bookmarks,
//! layout, snapshots) through an injected [`KeyValueStore`] rather than an
//! implicit global. Two implementations ship here: an in-memory store for
//! tests and a directory-backed store mapping each key to one file.
//!
//! Persistence is best-effort everywhere: the adapter in [`adapter`] logs
//! failures and falls back to empty state instead of surfacing them.

pub mod adapter;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::trace;

pub use adapter::{FilePersistence, LayoutConfig};

/// Custom error type for the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("store poisoned by a panicked writer")]
    Poisoned,

    #[error("An underlying I/O error occurred.")]
    StdIo(#[from] std::io::Error),
}

/// A minimal string key-value store.
///
/// Implementations must tolerate concurrent readers from multiple open
/// files; each open file writes only its own key namespace.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    /// Write a value, replacing any existing one.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    /// Delete a key; deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    // Keys contain filenames chosen by the user; everything outside a safe
    // character set becomes '_' so a key can never escape the root.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => {
                trace!(key, path = %path.display(), "read persisted value");
                Ok(Some(value))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        fs::write(&path, value)?;
        trace!(key, path = %path.display(), "wrote persisted value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        store.remove("k").unwrap();
    }

    #[test]
    fn test_directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        store.set("r2-patches-demo.bin", "[]").unwrap();
        assert_eq!(
            store.get("r2-patches-demo.bin").unwrap().as_deref(),
            Some("[]")
        );
        store.remove("r2-patches-demo.bin").unwrap();
        assert!(store.get("r2-patches-demo.bin").unwrap().is_none());
    }

    #[test]
    fn test_directory_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        store.set("r2-patches-../../etc/passwd", "x").unwrap();
        assert_eq!(
            store.get("r2-patches-../../etc/passwd").unwrap().as_deref(),
            Some("x")
        );
        // Nothing may be written outside the root
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
