//! Immutable base byte buffer.
//!
//! A `ByteBuffer` is the fixed byte image of one open file. It is built once,
//! from raw bytes or from a hex string, and never mutated afterwards; all
//! edits live in the patch overlay layered on top of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip everything that is not an ASCII hex digit from `input`.
///
/// Hex sources arrive with whitespace, separators, and the occasional `0x`
/// prefix; only the digits matter.
pub fn sanitize_hex(input: &str) -> String {
    input.chars().filter(char::is_ascii_hexdigit).collect()
}

/// The immutable byte sequence backing one open file.
///
/// Length is fixed at construction. A trailing unpaired nibble in a hex
/// source is dropped, matching the two-characters-per-byte token model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    /// Wrap an already-materialized byte image.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Build a buffer from a hex string, ignoring non-hex characters.
    pub fn from_hex(hex: &str) -> Self {
        let cleaned = sanitize_hex(hex);
        let whole = cleaned.len() - cleaned.len() % 2;
        // Infallible: `cleaned` contains only hex digits and has even length.
        let bytes = hex::decode(&cleaned[..whole]).unwrap_or_default();
        Self { bytes }
    }

    /// Number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte at `offset`, or `None` when out of range.
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    /// Whether `offset` addresses a byte in this buffer.
    pub fn contains(&self, offset: usize) -> bool {
        offset < self.bytes.len()
    }

    /// The full byte image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex rendition of the whole buffer.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Two-character uppercase hex token for the byte at `offset`.
    pub fn hex_token(&self, offset: usize) -> Option<String> {
        self.get(offset).map(|b| format!("{b:02X}"))
    }
}

impl fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer({} bytes)", self.bytes.len())
    }
}
