//! Editing layer: overlay, history, imports, annotations, and the session.
//!
//! Everything here is synchronous, in-process state with exactly one logical
//! owner per open file; offloading lives behind the worker boundary.

pub mod annotations;
pub mod bookmarks;
pub mod checksum;
pub mod history;
pub mod import;
pub mod overlay;
pub mod session;
pub mod snapshot;

pub use annotations::{
    AnnotationExport, AnnotationField, AnnotationRecord, AnnotationStore, LabelConflict,
};
pub use bookmarks::BookmarkSet;
pub use history::{HistoryStack, DEFAULT_HISTORY_LIMIT};
pub use import::validate_patch_import;
pub use overlay::{PatchEvent, PatchOverlay};
pub use session::{DiffReport, Session};
pub use snapshot::Snapshot;
