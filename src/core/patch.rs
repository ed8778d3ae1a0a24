//! Patch records: one byte override at one offset.
//!
//! The wire form matches the persisted and exported JSON exactly:
//! `{"offset": 4, "value": "90"}` with the value as two uppercase hex
//! characters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single byte override layered over the base buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Patch {
    /// Offset of the overridden byte, counted from the start of the buffer
    pub offset: usize,
    /// Replacement byte value
    #[serde(with = "hex_byte")]
    pub value: u8,
}

impl Patch {
    /// Create a new patch record.
    pub fn new(offset: usize, value: u8) -> Self {
        Self { offset, value }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} -> {:02X}", self.offset, self.value)
    }
}

/// Serde adapter for the two-hex-character byte encoding.
mod hex_byte {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:02X}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_hex_byte(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid byte value {text:?}")))
    }

    pub(crate) fn parse_hex_byte(text: &str) -> Option<u8> {
        if text.len() != 2 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u8::from_str_radix(text, 16).ok()
    }
}

/// Parse a two-hex-character byte token (case-insensitive).
///
/// Returns `None` for anything that is not exactly two hex digits.
pub fn parse_hex_byte(text: &str) -> Option<u8> {
    hex_byte::parse_hex_byte(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_uses_uppercase_tokens() {
        let patch = Patch::new(0, 0xff);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"offset":0,"value":"FF"}"#);

        let back: Patch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn test_deserialize_accepts_lowercase() {
        let patch: Patch = serde_json::from_str(r#"{"offset":1,"value":"aa"}"#).unwrap();
        assert_eq!(patch, Patch::new(1, 0xaa));
    }

    #[test]
    fn test_deserialize_rejects_bad_tokens() {
        for raw in [
            r#"{"offset":0,"value":"zz"}"#,
            r#"{"offset":0,"value":"F"}"#,
            r#"{"offset":0,"value":"FFF"}"#,
            r#"{"offset":0,"value":255}"#,
        ] {
            assert!(serde_json::from_str::<Patch>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_parse_hex_byte() {
        assert_eq!(parse_hex_byte("Ff"), Some(0xff));
        assert_eq!(parse_hex_byte("00"), Some(0));
        assert_eq!(parse_hex_byte("g0"), None);
        assert_eq!(parse_hex_byte(""), None);
    }

    #[test]
    fn test_ordering_is_by_offset() {
        let mut patches = vec![Patch::new(4, 1), Patch::new(0, 9), Patch::new(2, 5)];
        patches.sort();
        let offsets: Vec<usize> = patches.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
    }
}
