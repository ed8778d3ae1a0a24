//! Address-keyed labels and comments with conflict detection.
//!
//! The store maps normalized addresses to annotations. Field edits are
//! staged first (mirroring an edit box that only commits on an explicit
//! keystroke or on losing focus) and promoted into the store on commit;
//! cancel discards the draft. Committed mutations are recorded in the
//! store's own history, independent of the patch overlay's: renaming a
//! symbol and patching a byte are unrelated actions.
//!
//! Label uniqueness is deliberately not enforced on write. Duplicates are
//! surfaced by [`AnnotationStore::detect_conflicts`] and rewritten by
//! [`AnnotationStore::resolve_conflict`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Address, Annotation};
use crate::editor::history::{HistoryStack, DEFAULT_HISTORY_LIMIT};

/// Which annotation field an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationField {
    Label,
    Comment,
}

/// One label rewrite performed by conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRename {
    pub address: Address,
    pub previous: String,
    pub renamed: String,
}

/// One undoable annotation-store mutation.
#[derive(Debug, Clone)]
pub enum AnnotationEvent {
    /// A single field changed at one address (old -> new).
    FieldEdit {
        address: Address,
        field: AnnotationField,
        previous: Option<String>,
        value: Option<String>,
    },
    /// Both fields removed at one address.
    Clear {
        address: Address,
        previous: Annotation,
    },
    /// The whole store emptied.
    ClearAll {
        previous: BTreeMap<Address, Annotation>,
    },
    /// A duplicate-label group rewritten.
    ResolveConflict {
        label: String,
        renames: Vec<LabelRename>,
    },
}

/// A draft edit not yet promoted into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEdit {
    pub address: Address,
    pub field: AnnotationField,
    pub text: String,
}

/// A label used at more than one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelConflict {
    pub label: String,
    pub addresses: Vec<Address>,
}

/// One row of the annotation export payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub addr: Address,
    pub label: String,
    pub comment: String,
    pub instruction: String,
}

/// The serializable annotation export artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationExport {
    pub annotations: Vec<AnnotationRecord>,
}

/// Address-keyed annotation store with staged edits and linear history.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    entries: BTreeMap<Address, Annotation>,
    history: HistoryStack<AnnotationEvent>,
    staged: Option<StagedEdit>,
}

impl AnnotationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            history: HistoryStack::with_limit(DEFAULT_HISTORY_LIMIT),
            staged: None,
        }
    }

    /// Restore a store from persisted entries without creating history.
    ///
    /// Empty annotations are not materialized.
    pub fn from_entries(entries: BTreeMap<Address, Annotation>) -> Self {
        let mut store = Self::new();
        store.entries = entries.into_iter().filter(|(_, a)| !a.is_empty()).collect();
        store
    }

    /// The annotation at `address`, if materialized.
    pub fn get(&self, address: &Address) -> Option<&Annotation> {
        self.entries.get(address)
    }

    /// Committed label text at `address`, if any.
    pub fn label(&self, address: &Address) -> Option<&str> {
        self.entries.get(address)?.label.as_deref()
    }

    /// Committed comment text at `address`, if any.
    pub fn comment(&self, address: &Address) -> Option<&str> {
        self.entries.get(address)?.comment.as_deref()
    }

    /// Number of annotated addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no address is annotated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All materialized entries, ascending by address.
    pub fn entries(&self) -> &BTreeMap<Address, Annotation> {
        &self.entries
    }

    /// Commit a label at `address`. Empty (or whitespace-only) text clears
    /// the field. Recorded as one history entry; a no-op change records
    /// nothing.
    pub fn set_label(&mut self, address: Address, label: &str) {
        self.set_field(address, AnnotationField::Label, label);
    }

    /// Commit a comment at `address`; same rules as [`Self::set_label`].
    pub fn set_comment(&mut self, address: Address, comment: &str) {
        self.set_field(address, AnnotationField::Comment, comment);
    }

    fn set_field(&mut self, address: Address, field: AnnotationField, text: &str) {
        let trimmed = text.trim();
        let value = (!trimmed.is_empty()).then(|| trimmed.to_string());
        let previous = self.field_value(&address, field);
        if previous == value {
            return;
        }
        self.write_field(&address, field, value.clone());
        self.history.push(AnnotationEvent::FieldEdit {
            address,
            field,
            previous,
            value,
        });
    }

    fn field_value(&self, address: &Address, field: AnnotationField) -> Option<String> {
        let annotation = self.entries.get(address)?;
        match field {
            AnnotationField::Label => annotation.label.clone(),
            AnnotationField::Comment => annotation.comment.clone(),
        }
    }

    fn write_field(&mut self, address: &Address, field: AnnotationField, value: Option<String>) {
        let annotation = self.entries.entry(address.clone()).or_default();
        match field {
            AnnotationField::Label => annotation.label = value,
            AnnotationField::Comment => annotation.comment = value,
        }
        if annotation.is_empty() {
            self.entries.remove(address);
        }
    }

    /// Stage a draft edit, replacing any existing draft.
    pub fn stage(&mut self, address: Address, field: AnnotationField, text: impl Into<String>) {
        self.staged = Some(StagedEdit {
            address,
            field,
            text: text.into(),
        });
    }

    /// The current draft, if any.
    pub fn staged(&self) -> Option<&StagedEdit> {
        self.staged.as_ref()
    }

    /// Promote the draft into the store (commit keystroke or focus loss).
    /// Returns `false` when no draft was staged.
    pub fn commit_staged(&mut self) -> bool {
        match self.staged.take() {
            Some(edit) => {
                self.set_field(edit.address, edit.field, &edit.text);
                true
            }
            None => false,
        }
    }

    /// Discard the draft without touching the store (cancel keystroke).
    pub fn cancel_staged(&mut self) {
        self.staged = None;
    }

    /// Remove both fields at `address` as one undoable step.
    /// Returns `false` when nothing was stored there.
    pub fn clear(&mut self, address: &Address) -> bool {
        match self.entries.remove(address) {
            Some(previous) => {
                self.history.push(AnnotationEvent::Clear {
                    address: address.clone(),
                    previous,
                });
                true
            }
            None => false,
        }
    }

    /// Empty the store as one undoable step.
    pub fn clear_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let previous = std::mem::take(&mut self.entries);
        self.history.push(AnnotationEvent::ClearAll { previous });
    }

    /// Every label used at two or more addresses.
    ///
    /// Groups are returned in first-seen scan order (the scan walks
    /// addresses in ascending order), each group's addresses ascending.
    pub fn detect_conflicts(&self) -> Vec<LabelConflict> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<String, Vec<Address>> = BTreeMap::new();
        for (address, annotation) in &self.entries {
            let Some(label) = annotation.label.as_ref() else {
                continue;
            };
            let group = groups.entry(label.clone()).or_insert_with(|| {
                order.push(label.clone());
                Vec::new()
            });
            group.push(address.clone());
        }
        order
            .into_iter()
            .filter_map(|label| {
                let addresses = groups.remove(&label)?;
                (addresses.len() >= 2).then_some(LabelConflict { label, addresses })
            })
            .collect()
    }

    /// Rewrite a duplicate-label group so no two addresses share `label`.
    ///
    /// The lowest address keeps the label; every other address is renamed
    /// `<label>_<address>`. Deterministic, and unique within the group
    /// because addresses are unique. Recorded as one undoable event.
    /// Returns the number of renames performed.
    pub fn resolve_conflict(&mut self, label: &str) -> usize {
        let colliding: Vec<Address> = self
            .entries
            .iter()
            .filter(|(_, a)| a.label.as_deref() == Some(label))
            .map(|(address, _)| address.clone())
            .collect();
        if colliding.len() < 2 {
            return 0;
        }

        let mut renames = Vec::with_capacity(colliding.len() - 1);
        for address in colliding.into_iter().skip(1) {
            let renamed = format!("{label}_{address}");
            self.write_field(&address, AnnotationField::Label, Some(renamed.clone()));
            renames.push(LabelRename {
                address,
                previous: label.to_string(),
                renamed,
            });
        }
        let count = renames.len();
        self.history.push(AnnotationEvent::ResolveConflict {
            label: label.to_string(),
            renames,
        });
        count
    }

    /// Join every annotated address against the disassembly collaborator's
    /// instruction lookup, producing the export payload sorted by address.
    pub fn export_all<F>(&self, instruction_lookup: F) -> AnnotationExport
    where
        F: Fn(&Address) -> Option<String>,
    {
        let annotations = self
            .entries
            .iter()
            .map(|(address, annotation)| AnnotationRecord {
                addr: address.clone(),
                label: annotation.label_str().to_string(),
                comment: annotation.comment_str().to_string(),
                instruction: instruction_lookup(address).unwrap_or_default(),
            })
            .collect();
        AnnotationExport { annotations }
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Roll back the most recent committed mutation.
    pub fn undo(&mut self) -> bool {
        let Some(event) = self.history.undo().cloned() else {
            return false;
        };
        self.invert_event(event);
        true
    }

    /// Re-apply the most recently undone mutation.
    pub fn redo(&mut self) -> bool {
        let Some(event) = self.history.redo().cloned() else {
            return false;
        };
        self.replay_event(event);
        true
    }

    /// Drop all history (buffer replacement invalidates pending edits).
    pub fn reset_history(&mut self) {
        self.history.clear();
        self.staged = None;
    }

    fn invert_event(&mut self, event: AnnotationEvent) {
        match event {
            AnnotationEvent::FieldEdit {
                address,
                field,
                previous,
                ..
            } => self.write_field(&address, field, previous),
            AnnotationEvent::Clear { address, previous } => {
                self.entries.insert(address, previous);
            }
            AnnotationEvent::ClearAll { previous } => {
                self.entries = previous;
            }
            AnnotationEvent::ResolveConflict { renames, .. } => {
                for rename in renames {
                    self.write_field(
                        &rename.address,
                        AnnotationField::Label,
                        Some(rename.previous),
                    );
                }
            }
        }
    }

    fn replay_event(&mut self, event: AnnotationEvent) {
        match event {
            AnnotationEvent::FieldEdit {
                address,
                field,
                value,
                ..
            } => self.write_field(&address, field, value),
            AnnotationEvent::Clear { address, .. } => {
                self.entries.remove(&address);
            }
            AnnotationEvent::ClearAll { .. } => {
                self.entries.clear();
            }
            AnnotationEvent::ResolveConflict { renames, .. } => {
                for rename in renames {
                    self.write_field(
                        &rename.address,
                        AnnotationField::Label,
                        Some(rename.renamed),
                    );
                }
            }
        }
    }
}
