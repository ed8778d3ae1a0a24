//! Error types for the hexpatch engine.
//!
//! This module provides structured error handling using thiserror. Import
//! failures carry their own sub-taxonomy so callers can render the exact
//! user-facing message ("Import is not valid JSON" vs. a per-entry reason).

use thiserror::Error;

/// Main error type for hexpatch operations.
#[derive(Debug, Error)]
pub enum HexPatchError {
    /// Offset outside the bounds of the current buffer
    #[error("offset {offset:#x} is out of range for a {len}-byte buffer")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// Patch import rejected; no partial application took place
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Persistence layer failure (best-effort; usually logged and swallowed)
    #[error("persistence error: {0}")]
    Persistence(#[from] crate::persist::PersistenceError),

    /// Hex source loading failure
    #[error("source error: {0}")]
    Source(#[from] crate::source::SourceError),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for hexpatch operations
pub type Result<T> = std::result::Result<T, HexPatchError>;

/// Why a patch import was rejected.
///
/// Validation is atomic: any variant here means the overlay was left
/// untouched. The `Display` strings are the user-facing messages.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The import text did not parse as a JSON array of entries
    #[error("Import is not valid JSON")]
    NotStructured,

    /// A specific entry failed validation; nothing was applied
    #[error("entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}
