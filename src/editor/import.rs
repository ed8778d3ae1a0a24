//! Atomic validation of patch import batches.
//!
//! A candidate batch is validated in full before anything is applied: the
//! text must parse as a JSON array, and every entry needs an in-range
//! integer offset plus a two-hex-character value. The first violation
//! rejects the whole batch, so a partially valid import never mutates the
//! overlay.

use serde_json::Value;

use crate::core::{parse_hex_byte, Patch};
use crate::error::ImportError;

/// Validate `raw` as a patch batch for a buffer of `buffer_len` bytes.
///
/// Returns the full batch (values normalized to uppercase by the `Patch`
/// wire form) or the first error. Checks run in order: JSON parse, then
/// per-entry offset and value validation.
pub fn validate_patch_import(raw: &str, buffer_len: usize) -> Result<Vec<Patch>, ImportError> {
    let parsed: Value = serde_json::from_str(raw).map_err(|err| {
        tracing::debug!(error = %err, "import text is not valid JSON");
        ImportError::NotStructured
    })?;
    let entries = parsed.as_array().ok_or(ImportError::NotStructured)?;

    let mut patches = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        patches.push(validate_entry(entry, index, buffer_len)?);
    }
    Ok(patches)
}

fn validate_entry(entry: &Value, index: usize, buffer_len: usize) -> Result<Patch, ImportError> {
    let invalid = |reason: &str| ImportError::InvalidEntry {
        index,
        reason: reason.to_string(),
    };

    let object = entry.as_object().ok_or_else(|| invalid("not an object"))?;

    let offset = object
        .get("offset")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("invalid offset"))?;
    let offset = usize::try_from(offset).map_err(|_| invalid("invalid offset"))?;
    if offset >= buffer_len {
        return Err(invalid("offset out of range"));
    }

    let value = object
        .get("value")
        .and_then(Value::as_str)
        .and_then(parse_hex_byte)
        .ok_or_else(|| invalid("invalid value"))?;

    Ok(Patch::new(offset, value))
}
