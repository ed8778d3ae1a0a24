//! Per-file editing session.
//!
//! A `Session` is the single logical owner of one open file's state: the
//! immutable buffer, the patch overlay and its history, the annotation
//! store, bookmarks, and display layout. It restores persisted state when
//! the file is opened and writes it back fire-and-forget after each
//! mutation; persistence failures never block editing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Address, ByteBuffer, Patch};
use crate::editor::annotations::{AnnotationExport, AnnotationField, AnnotationStore};
use crate::editor::bookmarks::BookmarkSet;
use crate::editor::checksum::{compute_checksums, Checksums};
use crate::editor::import::validate_patch_import;
use crate::editor::overlay::PatchOverlay;
use crate::editor::snapshot::Snapshot;
use crate::error::{HexPatchError, ImportError, Result};
use crate::persist::{FilePersistence, LayoutConfig};
use crate::source::LoadedHex;
use crate::worker::{ByteProcessor, Request, Response};

/// Checksums of the base and patched images, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChecksums {
    pub original: Checksums,
    pub current: Checksums,
}

/// One changed byte in the diff report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChange {
    pub offset: usize,
    pub original: String,
    pub value: String,
}

/// Exportable patch-diff report for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub created_at: DateTime<Utc>,
    pub file: String,
    pub byte_length: usize,
    pub original_size: u64,
    pub truncated: bool,
    pub checksums: DiffChecksums,
    pub changes: Vec<DiffChange>,
}

/// One open file's editing state.
pub struct Session {
    file: String,
    base_address: u64,
    overlay: PatchOverlay,
    annotations: AnnotationStore,
    bookmarks: BookmarkSet,
    layout: LayoutConfig,
    snapshots: Vec<Snapshot>,
    persistence: Option<FilePersistence>,
    original_length: u64,
    truncated: bool,
}

impl Session {
    /// Open `file` from a hex source, restoring any persisted state.
    pub fn open(file: impl Into<String>, hex: &str, persistence: Option<FilePersistence>) -> Self {
        Self::from_buffer(file, ByteBuffer::from_hex(hex), persistence)
    }

    /// Open from a loader result, keeping its truncation metadata.
    pub fn open_loaded(
        file: impl Into<String>,
        loaded: &LoadedHex,
        persistence: Option<FilePersistence>,
    ) -> Self {
        let mut session = Self::from_buffer(
            file,
            ByteBuffer::new(loaded.bytes.to_vec()),
            persistence,
        );
        session.original_length = loaded.original_length;
        session.truncated = loaded.truncated;
        session
    }

    /// Open a file on disk through a hex source collaborator.
    pub fn open_file(
        path: &std::path::Path,
        source: &dyn crate::source::HexSource,
        persistence: Option<FilePersistence>,
    ) -> Result<Self> {
        let loaded = source.load_hex(path)?;
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::open_loaded(file, &loaded, persistence))
    }

    /// Open via the background processor, letting it materialize the hex.
    ///
    /// Falls back to inline materialization when the processor yields no
    /// response (it cannot happen with the shipped implementations, but the
    /// execution strategy is not this session's concern).
    pub fn open_with_processor(
        file: impl Into<String>,
        hex: &str,
        persistence: Option<FilePersistence>,
        processor: &mut dyn ByteProcessor,
    ) -> Self {
        processor.submit(Request::LoadBuffer {
            hex: hex.to_string(),
        });
        let buffer = match processor.recv() {
            Some(Response::Buffer { bytes, .. }) => ByteBuffer::new(bytes),
            _ => ByteBuffer::from_hex(hex),
        };
        Self::from_buffer(file, buffer, persistence)
    }

    fn from_buffer(
        file: impl Into<String>,
        buffer: ByteBuffer,
        persistence: Option<FilePersistence>,
    ) -> Self {
        let file = file.into();
        let original_length = buffer.len() as u64;
        let mut session = Self {
            file,
            base_address: 0,
            overlay: PatchOverlay::new(buffer),
            annotations: AnnotationStore::new(),
            bookmarks: BookmarkSet::new(),
            layout: LayoutConfig::default(),
            snapshots: Vec::new(),
            persistence,
            original_length,
            truncated: false,
        };
        session.restore();
        session
    }

    /// Set the display base address used to format offsets as addresses.
    pub fn with_base_address(mut self, base_address: u64) -> Self {
        self.base_address = base_address;
        self
    }

    // Restoring persisted state never creates history: only live edits are
    // undoable.
    fn restore(&mut self) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };
        self.overlay.load_batch(persistence.load_patches());
        self.annotations = AnnotationStore::from_entries(persistence.load_annotations());
        self.bookmarks = BookmarkSet::from_offsets(persistence.load_bookmarks());
        self.layout = persistence.load_layout();
        self.snapshots = persistence.load_snapshots();
    }

    /// Replace the buffer from a new hex source for the same file.
    ///
    /// All pending edits are invalidated (both histories reset) and the
    /// persisted patch set is re-applied against the new image.
    pub fn reload(&mut self, hex: &str) {
        self.overlay.replace_buffer(ByteBuffer::from_hex(hex));
        self.annotations.reset_history();
        if let Some(persistence) = &self.persistence {
            self.overlay.load_batch(persistence.load_patches());
        }
    }

    /// The file identifier this session edits.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.overlay.buffer().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.overlay.buffer().is_empty()
    }

    /// The patch overlay (read-only).
    pub fn overlay(&self) -> &PatchOverlay {
        &self.overlay
    }

    /// The annotation store (read-only).
    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// The bookmark set (read-only).
    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    /// Current display layout.
    pub fn layout(&self) -> LayoutConfig {
        self.layout
    }

    /// The display address of a byte offset.
    pub fn address_at(&self, offset: usize) -> Address {
        Address::from_offset(self.base_address, offset)
    }

    // ---- patches ------------------------------------------------------

    /// The byte shown at `offset`.
    pub fn effective_byte(&self, offset: usize) -> Result<u8> {
        self.overlay.effective_byte(offset)
    }

    /// Write a byte override; returns the previous effective value.
    pub fn apply_patch(&mut self, offset: usize, value: u8) -> Result<u8> {
        let previous = self.overlay.apply_patch(offset, value)?;
        self.save_patches();
        Ok(previous)
    }

    /// Remove the override at `offset`.
    pub fn revert_patch(&mut self, offset: usize) -> bool {
        let reverted = self.overlay.revert(offset);
        if reverted {
            self.save_patches();
        }
        reverted
    }

    /// Remove every override as one undoable step.
    pub fn clear_patches(&mut self) {
        self.overlay.clear();
        self.save_patches();
    }

    /// Undo the most recent overlay mutation.
    pub fn undo_patch(&mut self) -> bool {
        let undone = self.overlay.undo();
        if undone {
            self.save_patches();
        }
        undone
    }

    /// Redo the most recently undone overlay mutation.
    pub fn redo_patch(&mut self) -> bool {
        let redone = self.overlay.redo();
        if redone {
            self.save_patches();
        }
        redone
    }

    /// Validate and apply an import batch atomically.
    ///
    /// On success the whole batch lands as one undoable step and the count
    /// of applied patches is returned; on failure the overlay is untouched.
    pub fn import_patches(&mut self, raw: &str) -> std::result::Result<usize, ImportError> {
        let batch = validate_patch_import(raw, self.len())?;
        let applied = self.overlay.import(batch);
        self.save_patches();
        Ok(applied)
    }

    /// Export the patch list as pretty JSON, mirroring the persisted form.
    pub fn export_patches(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.overlay.serialize())?)
    }

    /// Build the downloadable diff report for the current state.
    pub fn export_diff_report(&self) -> DiffReport {
        let base = self.overlay.buffer().as_bytes();
        let current = self.overlay.effective_bytes();
        let changes = self
            .overlay
            .serialize()
            .into_iter()
            .filter(|patch| base[patch.offset] != patch.value)
            .map(|patch| DiffChange {
                offset: patch.offset,
                original: format!("{:02X}", base[patch.offset]),
                value: format!("{:02X}", patch.value),
            })
            .collect();
        DiffReport {
            created_at: Utc::now(),
            file: self.file.clone(),
            byte_length: base.len(),
            original_size: self.original_length,
            truncated: self.truncated,
            checksums: DiffChecksums {
                original: compute_checksums(base),
                current: compute_checksums(&current),
            },
            changes,
        }
    }

    // ---- annotations --------------------------------------------------

    /// Commit a label at `address`.
    pub fn set_label(&mut self, address: Address, label: &str) {
        self.annotations.set_label(address, label);
        self.save_annotations();
    }

    /// Commit a comment at `address`.
    pub fn set_comment(&mut self, address: Address, comment: &str) {
        self.annotations.set_comment(address, comment);
        self.save_annotations();
    }

    /// Stage a draft annotation edit.
    pub fn stage_annotation(
        &mut self,
        address: Address,
        field: AnnotationField,
        text: impl Into<String>,
    ) {
        self.annotations.stage(address, field, text);
    }

    /// Promote the staged draft (commit keystroke / focus loss).
    pub fn commit_staged_annotation(&mut self) -> bool {
        let committed = self.annotations.commit_staged();
        if committed {
            self.save_annotations();
        }
        committed
    }

    /// Discard the staged draft (cancel keystroke).
    pub fn cancel_staged_annotation(&mut self) {
        self.annotations.cancel_staged();
    }

    /// Remove both fields at `address`.
    pub fn clear_annotation(&mut self, address: &Address) -> bool {
        let cleared = self.annotations.clear(address);
        if cleared {
            self.save_annotations();
        }
        cleared
    }

    /// Empty the annotation store as one undoable step.
    pub fn clear_all_annotations(&mut self) {
        self.annotations.clear_all();
        self.save_annotations();
    }

    /// Rewrite one duplicate-label group; returns the rename count.
    pub fn resolve_label_conflict(&mut self, label: &str) -> usize {
        let renamed = self.annotations.resolve_conflict(label);
        if renamed > 0 {
            self.save_annotations();
        }
        renamed
    }

    /// Undo the most recent annotation mutation.
    pub fn undo_annotation(&mut self) -> bool {
        let undone = self.annotations.undo();
        if undone {
            self.save_annotations();
        }
        undone
    }

    /// Redo the most recently undone annotation mutation.
    pub fn redo_annotation(&mut self) -> bool {
        let redone = self.annotations.redo();
        if redone {
            self.save_annotations();
        }
        redone
    }

    /// Export all annotations joined with disassembly text.
    pub fn export_annotations<F>(&self, instruction_lookup: F) -> AnnotationExport
    where
        F: Fn(&Address) -> Option<String>,
    {
        self.annotations.export_all(instruction_lookup)
    }

    // ---- bookmarks and layout -----------------------------------------

    /// Bookmark `offset`. Fails when the offset is out of range; returns
    /// `false` when it was already bookmarked.
    pub fn add_bookmark(&mut self, offset: usize) -> Result<bool> {
        if !self.overlay.buffer().contains(offset) {
            return Err(HexPatchError::OffsetOutOfRange {
                offset,
                len: self.len(),
            });
        }
        let added = self.bookmarks.add(offset);
        if added {
            self.save_bookmarks();
        }
        Ok(added)
    }

    /// Remove a bookmark.
    pub fn remove_bookmark(&mut self, offset: usize) -> bool {
        let removed = self.bookmarks.remove(offset);
        if removed {
            self.save_bookmarks();
        }
        removed
    }

    /// Update the display layout; non-positive values are rejected.
    pub fn set_layout(&mut self, layout: LayoutConfig) {
        if layout.columns == 0 || layout.word == 0 {
            tracing::debug!(?layout, "ignoring invalid layout");
            return;
        }
        self.layout = layout;
        if let Some(persistence) = &self.persistence {
            persistence.save_layout(layout);
        }
    }

    // ---- snapshots ----------------------------------------------------

    /// Persisted snapshots for this file.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Capture the current base and patched images under `name`.
    pub fn save_snapshot(&mut self, name: &str) -> Snapshot {
        let name = if name.trim().is_empty() {
            format!("Snapshot {}", self.snapshots.len() + 1)
        } else {
            name.trim().to_string()
        };
        let snapshot = Snapshot::capture(name, &self.overlay, &self.file);
        self.snapshots.push(snapshot.clone());
        self.save_snapshots();
        snapshot
    }

    /// Restore a snapshot wholesale: new base image, overrides rebuilt from
    /// the captured diff, histories cleared.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let (buffer, patches) = snapshot.restore();
        self.original_length = buffer.len() as u64;
        self.truncated = false;
        self.overlay.replace_buffer(buffer);
        self.overlay.load_batch(patches);
        self.annotations.reset_history();
        self.save_patches();
    }

    /// Delete a snapshot by id.
    pub fn delete_snapshot(&mut self, id: Uuid) -> bool {
        let before = self.snapshots.len();
        self.snapshots.retain(|snapshot| snapshot.id != id);
        let deleted = self.snapshots.len() != before;
        if deleted {
            self.save_snapshots();
        }
        deleted
    }

    // ---- persistence --------------------------------------------------

    /// Persist everything at once (e.g. before releasing the session).
    pub fn save(&self) {
        self.save_patches();
        self.save_annotations();
        self.save_bookmarks();
        if let Some(persistence) = &self.persistence {
            persistence.save_layout(self.layout);
        }
        self.save_snapshots();
    }

    fn save_patches(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save_patches(&self.overlay.serialize());
        }
    }

    fn save_annotations(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save_annotations(self.annotations.entries());
        }
    }

    fn save_bookmarks(&self) {
        if let Some(persistence) = &self.persistence {
            let offsets: Vec<usize> = self.bookmarks.iter().collect();
            persistence.save_bookmarks(&offsets);
        }
    }

    fn save_snapshots(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save_snapshots(&self.snapshots);
        }
    }
}
