//! Bounded hex-source loading.
//!
//! The engine consumes binaries as hex strings through the [`HexSource`]
//! boundary; the file/network layer behind it is a collaborator, not part
//! of the engine. `FileHexSource` is the file-backed implementation: it
//! memory-maps the file, enforces a hard size limit, and truncates the
//! loaded prefix to a configurable byte cap so huge binaries cannot stall
//! an interactive surface.

pub mod error;

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::source::error::Result;
pub use crate::source::error::SourceError;

/// Resource limits for source loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
    /// The maximum number of bytes materialized into the hex string;
    /// anything beyond it is truncated, not an error.
    pub max_bytes: usize,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_bytes: 64 * 1024,
        }
    }
}

/// A loaded hex source plus its truncation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedHex {
    /// Raw loaded prefix.
    pub bytes: Bytes,
    /// Lowercase hex rendition of `bytes`.
    pub hex: String,
    /// Number of bytes loaded.
    pub byte_length: usize,
    /// Size of the file on disk.
    pub original_length: u64,
    /// Whether the loaded prefix is shorter than the file.
    pub truncated: bool,
}

/// The collaborator boundary for obtaining hex sources.
pub trait HexSource {
    fn load_hex(&self, path: &Path) -> Result<LoadedHex>;
}

/// File-backed hex source using memory-mapping and explicit limits.
#[derive(Debug, Clone, Default)]
pub struct FileHexSource {
    limits: SourceLimits,
}

impl FileHexSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SourceLimits) -> Self {
        Self { limits }
    }
}

impl HexSource for FileHexSource {
    fn load_hex(&self, path: &Path) -> Result<LoadedHex> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = self.limits.max_file_size,
            "loading hex source"
        );

        if file_size > self.limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = self.limits.max_file_size,
                "File is too large"
            );
            return Err(SourceError::FileTooLarge {
                limit: self.limits.max_file_size,
                found: file_size,
            });
        }

        // Zero-length files cannot be mapped; short-circuit to empty.
        if file_size == 0 {
            return Ok(LoadedHex {
                bytes: Bytes::new(),
                hex: String::new(),
                byte_length: 0,
                original_length: 0,
                truncated: false,
            });
        }

        // Safety: read-only map of a regular file we just opened.
        let mmap = unsafe { Mmap::map(&file)? };
        let take = mmap.len().min(self.limits.max_bytes);
        let truncated = take < mmap.len();
        if truncated {
            debug!(
                path = %path.display(),
                loaded = take,
                total = mmap.len(),
                "truncating hex source to the byte cap"
            );
        }
        let bytes = Bytes::copy_from_slice(&mmap[..take]);
        let hex = hex::encode(&bytes);

        Ok(LoadedHex {
            byte_length: bytes.len(),
            original_length: file_size,
            truncated,
            hex,
            bytes,
        })
    }
}
