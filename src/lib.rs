//! hexpatch: a binary patch-overlay and annotation engine.
//!
//! The engine lets a caller view a fixed byte buffer, apply and reverse
//! point edits without mutating the original bytes, import and export patch
//! sets as JSON, and attach labels and comments to addresses with
//! duplicate-label detection. Per-file state persists through an injected
//! key-value store, and heavy byte-array work can be offloaded to a
//! pausable background processor with a transparent synchronous fallback.
//!
//! Disassembly, instruction decoding, and binary format parsing are out of
//! scope: the buffer is an opaque byte sequence addressed by offset, and
//! instruction text is consumed through a lookup supplied by the caller.

/// Core data types module
pub mod core;

/// Overlay editing, history, imports, annotations, and sessions
pub mod editor;

/// Error taxonomy
pub mod error;

/// Tracing setup
pub mod logging;

/// Key-value persistence boundary
pub mod persist;

/// Bounded hex-source loading
pub mod source;

/// Offloaded byte processing
pub mod worker;

pub use crate::core::{Address, Annotation, ByteBuffer, Patch};
pub use crate::editor::{AnnotationStore, PatchOverlay, Session};
pub use crate::error::{HexPatchError, ImportError, Result};
