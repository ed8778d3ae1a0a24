//! Address keys for the annotation store.
//!
//! An `Address` is an opaque normalized string key (typically a hex-formatted
//! instruction address). It is deliberately distinct from the byte offsets
//! used by the patch overlay; the two indexing schemes are never mixed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A normalized address key.
///
/// Normalization lowercases the text, strips an optional `0x` prefix and any
/// non-hex characters, and re-prefixes `0x`. Input with no hex digits at all
/// is kept verbatim (trimmed) so foreign keys still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Normalize `raw` into an address key.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let hex: String = body
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if hex.is_empty() {
            if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
                return Self("0x0".to_string());
            }
            return Self(trimmed.to_string());
        }
        Self(format!("0x{hex}"))
    }

    /// Format the address of `base + offset`.
    pub fn from_offset(base: u64, offset: usize) -> Self {
        Self(format!("{:#x}", base.wrapping_add(offset as u64)))
    }

    /// Numeric value, when the key is a parseable hex address.
    pub fn value(&self) -> Option<u64> {
        let hex = self.0.strip_prefix("0x")?;
        u64::from_str_radix(hex, 16).ok()
    }

    /// The normalized key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

// Numeric ordering where both sides parse; unparseable keys sort last, then
// lexicographically. Keeps exports sorted by address.
impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
