//! Named captures of a patching session.
//!
//! A snapshot records the base and current (patched) byte images as hex
//! strings so a whole patch strategy can be parked and restored later.
//! Snapshots are persisted per file and survive sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::ByteBuffer;
use crate::editor::overlay::PatchOverlay;

/// A persisted capture of base and patched byte images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub base_hex: String,
    pub current_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub byte_length: usize,
}

impl Snapshot {
    /// Capture the overlay's base and effective images under `name`.
    pub fn capture(name: impl Into<String>, overlay: &PatchOverlay, file_name: &str) -> Self {
        let current = overlay.effective_bytes();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            base_hex: overlay.buffer().to_hex(),
            current_hex: hex::encode(&current),
            file_name: Some(file_name.to_string()),
            byte_length: current.len(),
        }
    }

    /// Whether the recorded images are consistent with the recorded length.
    ///
    /// Persisted snapshots come from an external store; a mangled entry is
    /// skipped rather than restored.
    pub fn is_well_formed(&self) -> bool {
        let base = ByteBuffer::from_hex(&self.base_hex);
        let current = ByteBuffer::from_hex(&self.current_hex);
        base.len() == current.len() && current.len() == self.byte_length
    }

    /// Rebuild the base buffer and the override set from the captured hex.
    ///
    /// Overrides are the positions where the current image differs from the
    /// base image.
    pub fn restore(&self) -> (ByteBuffer, Vec<crate::core::Patch>) {
        let base = ByteBuffer::from_hex(&self.base_hex);
        let current = ByteBuffer::from_hex(&self.current_hex);
        let patches = base
            .as_bytes()
            .iter()
            .zip(current.as_bytes())
            .enumerate()
            .filter(|(_, (b, c))| b != c)
            .map(|(offset, (_, &c))| crate::core::Patch::new(offset, c))
            .collect();
        (base, patches)
    }
}
