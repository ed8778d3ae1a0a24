//! Sparse patch overlay over an immutable byte buffer.
//!
//! The overlay is a last-write-wins `offset -> value` map. The base buffer
//! is never mutated; the "effective byte" at an offset is the overlay value
//! if present, else the base value. Every live mutation is recorded as a
//! [`PatchEvent`] in the overlay's history and interpreted by a single
//! undo/redo executor.

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::{ByteBuffer, Patch};
use crate::editor::history::{HistoryStack, DEFAULT_HISTORY_LIMIT};
use crate::error::{HexPatchError, Result};

/// One undoable overlay mutation.
#[derive(Debug, Clone)]
pub enum PatchEvent {
    /// A single byte override was written.
    /// `previous` is the prior overlay entry (`None` when the offset was
    /// unpatched), not the prior effective value.
    Edit {
        offset: usize,
        previous: Option<u8>,
        value: u8,
    },
    /// A single override was removed, restoring the base byte.
    Revert { offset: usize, previous: u8 },
    /// The overlay was replaced wholesale by a validated import batch.
    Import {
        previous: Vec<Patch>,
        replaced: Vec<Patch>,
    },
    /// All overrides were removed.
    Clear { previous: Vec<Patch> },
}

/// Patch overlay plus its private history for one open buffer.
#[derive(Debug)]
pub struct PatchOverlay {
    buffer: ByteBuffer,
    patches: BTreeMap<usize, u8>,
    history: HistoryStack<PatchEvent>,
}

impl PatchOverlay {
    /// Empty overlay over `buffer`.
    pub fn new(buffer: ByteBuffer) -> Self {
        Self {
            buffer,
            patches: BTreeMap::new(),
            history: HistoryStack::with_limit(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// The immutable base buffer.
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Replace the base buffer, dropping all overrides and history.
    ///
    /// Loading a new byte image invalidates every pending edit; persisted
    /// patches are re-applied separately via [`PatchOverlay::load_batch`].
    pub fn replace_buffer(&mut self, buffer: ByteBuffer) {
        self.buffer = buffer;
        self.patches.clear();
        self.history.clear();
    }

    /// Number of overridden offsets.
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Whether `offset` currently carries an override.
    pub fn is_patched(&self, offset: usize) -> bool {
        self.patches.contains_key(&offset)
    }

    /// The byte shown at `offset`: overlay value if present, else base.
    pub fn effective_byte(&self, offset: usize) -> Result<u8> {
        if let Some(&value) = self.patches.get(&offset) {
            return Ok(value);
        }
        self.buffer
            .get(offset)
            .ok_or(HexPatchError::OffsetOutOfRange {
                offset,
                len: self.buffer.len(),
            })
    }

    /// Materialize the full patched byte image.
    pub fn effective_bytes(&self) -> Vec<u8> {
        let mut bytes = self.buffer.as_bytes().to_vec();
        for (&offset, &value) in &self.patches {
            bytes[offset] = value;
        }
        bytes
    }

    /// Write a byte override, returning the previous effective value.
    ///
    /// Fails without touching any state when `offset` is out of range.
    /// Re-applying an identical value is still recorded; undo/redo stays
    /// symmetric either way.
    pub fn apply_patch(&mut self, offset: usize, value: u8) -> Result<u8> {
        let previous_effective = self.effective_byte(offset)?;
        let previous = self.patches.get(&offset).copied();
        self.history.push(PatchEvent::Edit {
            offset,
            previous,
            value,
        });
        self.patches.insert(offset, value);
        Ok(previous_effective)
    }

    /// Remove the override at `offset`, restoring the base byte.
    ///
    /// Returns `false` when the offset carried no override.
    pub fn revert(&mut self, offset: usize) -> bool {
        match self.patches.remove(&offset) {
            Some(previous) => {
                self.history.push(PatchEvent::Revert { offset, previous });
                true
            }
            None => false,
        }
    }

    /// Remove every override as one undoable step.
    pub fn clear(&mut self) {
        if self.patches.is_empty() {
            return;
        }
        let previous = self.serialize();
        self.patches.clear();
        self.history.push(PatchEvent::Clear { previous });
    }

    /// The overlay as a patch list, ascending by offset.
    pub fn serialize(&self) -> Vec<Patch> {
        self.patches
            .iter()
            .map(|(&offset, &value)| Patch::new(offset, value))
            .collect()
    }

    /// Replace the overlay wholesale without recording history.
    ///
    /// Used when restoring persisted state; reopening a file does not
    /// resurrect undo history. Entries out of range for the current buffer
    /// (the file shrank since they were saved) are dropped.
    pub fn load_batch(&mut self, patches: Vec<Patch>) {
        self.patches = self.sanitize_batch(patches);
    }

    /// Replace the overlay with a validated import batch as ONE undoable
    /// step, so a single undo reverts the whole import.
    pub fn import(&mut self, patches: Vec<Patch>) -> usize {
        let previous = self.serialize();
        self.patches = self.sanitize_batch(patches);
        let replaced = self.serialize();
        let applied = replaced.len();
        self.history.push(PatchEvent::Import { previous, replaced });
        applied
    }

    fn sanitize_batch(&self, patches: Vec<Patch>) -> BTreeMap<usize, u8> {
        let mut map = BTreeMap::new();
        for patch in patches {
            if self.buffer.contains(patch.offset) {
                map.insert(patch.offset, patch.value);
            } else {
                warn!(
                    offset = patch.offset,
                    len = self.buffer.len(),
                    "dropping out-of-range patch"
                );
            }
        }
        map
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Roll back the most recent mutation. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(event) = self.history.undo().cloned() else {
            return false;
        };
        self.invert_event(&event);
        true
    }

    /// Re-apply the most recently undone mutation.
    pub fn redo(&mut self) -> bool {
        let Some(event) = self.history.redo().cloned() else {
            return false;
        };
        self.replay_event(&event);
        true
    }

    fn invert_event(&mut self, event: &PatchEvent) {
        match event {
            PatchEvent::Edit {
                offset, previous, ..
            } => match previous {
                Some(value) => {
                    self.patches.insert(*offset, *value);
                }
                None => {
                    self.patches.remove(offset);
                }
            },
            PatchEvent::Revert { offset, previous } => {
                self.patches.insert(*offset, *previous);
            }
            PatchEvent::Import { previous, .. } | PatchEvent::Clear { previous } => {
                self.patches = previous.iter().map(|p| (p.offset, p.value)).collect();
            }
        }
    }

    fn replay_event(&mut self, event: &PatchEvent) {
        match event {
            PatchEvent::Edit { offset, value, .. } => {
                self.patches.insert(*offset, *value);
            }
            PatchEvent::Revert { offset, .. } => {
                self.patches.remove(offset);
            }
            PatchEvent::Import { replaced, .. } => {
                self.patches = replaced.iter().map(|p| (p.offset, p.value)).collect();
            }
            PatchEvent::Clear { .. } => {
                self.patches.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> PatchOverlay {
        PatchOverlay::new(ByteBuffer::from_hex("554889e5"))
    }

    #[test]
    fn test_effective_byte_prefers_overlay() {
        let mut ov = overlay();
        assert_eq!(ov.effective_byte(0).unwrap(), 0x55);

        let previous = ov.apply_patch(0, 0xff).unwrap();
        assert_eq!(previous, 0x55);
        assert_eq!(ov.effective_byte(0).unwrap(), 0xff);
        assert_eq!(ov.effective_byte(1).unwrap(), 0x48);
    }

    #[test]
    fn test_out_of_range_patch_is_rejected() {
        let mut ov = overlay();
        let err = ov.apply_patch(4, 0x00).unwrap_err();
        assert!(matches!(
            err,
            HexPatchError::OffsetOutOfRange { offset: 4, len: 4 }
        ));
        assert_eq!(ov.patch_count(), 0);
        assert!(!ov.can_undo());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut ov = overlay();
        ov.apply_patch(0, 0xff).unwrap();
        assert!(ov.undo());
        assert_eq!(ov.effective_byte(0).unwrap(), 0x55);
        assert!(ov.redo());
        assert_eq!(ov.effective_byte(0).unwrap(), 0xff);
        assert_eq!(ov.serialize(), vec![Patch::new(0, 0xff)]);
    }

    #[test]
    fn test_undo_restores_prior_override() {
        let mut ov = overlay();
        ov.apply_patch(2, 0x11).unwrap();
        ov.apply_patch(2, 0x22).unwrap();
        assert!(ov.undo());
        assert_eq!(ov.effective_byte(2).unwrap(), 0x11);
        assert!(ov.undo());
        assert_eq!(ov.effective_byte(2).unwrap(), 0x89);
    }

    #[test]
    fn test_revert_is_undoable() {
        let mut ov = overlay();
        ov.apply_patch(1, 0x90).unwrap();
        assert!(ov.revert(1));
        assert!(!ov.is_patched(1));
        assert!(!ov.revert(1));

        assert!(ov.undo());
        assert_eq!(ov.effective_byte(1).unwrap(), 0x90);
    }

    #[test]
    fn test_clear_is_one_undo_step() {
        let mut ov = overlay();
        ov.apply_patch(0, 0x01).unwrap();
        ov.apply_patch(1, 0x02).unwrap();
        ov.clear();
        assert_eq!(ov.patch_count(), 0);

        assert!(ov.undo());
        assert_eq!(ov.patch_count(), 2);
    }

    #[test]
    fn test_import_is_one_undo_step() {
        let mut ov = overlay();
        ov.apply_patch(0, 0x01).unwrap();
        let applied = ov.import(vec![Patch::new(2, 0xaa), Patch::new(3, 0xbb)]);
        assert_eq!(applied, 2);
        assert_eq!(
            ov.serialize(),
            vec![Patch::new(2, 0xaa), Patch::new(3, 0xbb)]
        );

        assert!(ov.undo());
        assert_eq!(ov.serialize(), vec![Patch::new(0, 0x01)]);
        assert!(ov.redo());
        assert_eq!(ov.patch_count(), 2);
    }

    #[test]
    fn test_load_batch_bypasses_history_and_sanitizes() {
        let mut ov = overlay();
        ov.load_batch(vec![Patch::new(1, 0xaa), Patch::new(40, 0xbb)]);
        assert_eq!(ov.serialize(), vec![Patch::new(1, 0xaa)]);
        assert!(!ov.can_undo());
    }

    #[test]
    fn test_replace_buffer_resets_state() {
        let mut ov = overlay();
        ov.apply_patch(0, 0xff).unwrap();
        ov.replace_buffer(ByteBuffer::from_hex("90"));
        assert_eq!(ov.patch_count(), 0);
        assert!(!ov.can_undo());
        assert_eq!(ov.effective_byte(0).unwrap(), 0x90);
    }

    #[test]
    fn test_serialize_load_batch_round_trip() {
        let mut ov = overlay();
        ov.apply_patch(3, 0x01).unwrap();
        ov.apply_patch(0, 0xfe).unwrap();
        let snapshot = ov.serialize();
        let before = ov.effective_bytes();

        let mut restored = overlay();
        restored.load_batch(snapshot);
        assert_eq!(restored.effective_bytes(), before);
    }
}
