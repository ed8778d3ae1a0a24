//! Annotation values: symbolic metadata attached to an address.

use serde::{Deserialize, Serialize};

/// A label and/or comment attached to one address.
///
/// An annotation with neither field set is never materialized in the store;
/// callers should treat [`Annotation::is_empty`] as "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Short symbolic name, e.g. a function or variable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Annotation {
    /// Annotation with only a label set.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            comment: None,
        }
    }

    /// Whether both fields are unset.
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.comment.is_none()
    }

    /// Label text, empty when unset.
    pub fn label_str(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    /// Comment text, empty when unset.
    pub fn comment_str(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }
}
