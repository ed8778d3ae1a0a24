//! The pure compute behind the processor.
//!
//! `WorkerCore` holds the processor-side base image and patch map and turns
//! each [`Request`] into exactly one [`Response`]. Both processor
//! implementations share it, which is what makes the synchronous fallback
//! functionally identical to the background task.

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::{ByteBuffer, Patch};
use crate::worker::{Request, Response};

/// Materialize a hex source into bytes, ignoring non-hex characters.
pub fn materialize_hex(hex: &str) -> Vec<u8> {
    ByteBuffer::from_hex(hex).as_bytes().to_vec()
}

/// Apply a patch list over a base image, last write wins per offset.
/// Out-of-range patches are ignored.
pub fn apply_patches(base: &[u8], patches: &[Patch]) -> Vec<u8> {
    let mut bytes = base.to_vec();
    for patch in patches {
        if let Some(slot) = bytes.get_mut(patch.offset) {
            *slot = patch.value;
        }
    }
    bytes
}

/// Processor-side state: one base image plus its patch map.
#[derive(Debug, Default)]
pub struct WorkerCore {
    base: Vec<u8>,
    patches: BTreeMap<usize, u8>,
}

impl WorkerCore {
    /// Handle one request, producing its response.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::LoadBuffer { hex } => {
                self.base = materialize_hex(&hex);
                self.patches.clear();
                self.buffer_response()
            }
            Request::ApplyPatch { offset, value } => {
                if offset < self.base.len() {
                    self.patches.insert(offset, value);
                } else {
                    warn!(offset, len = self.base.len(), "ignoring out-of-range patch request");
                }
                self.buffer_response()
            }
            Request::ExportPatches => {
                let patches = self.patch_list();
                // Infallible: Patch serialization cannot fail
                let json = serde_json::to_string_pretty(&patches).unwrap_or_default();
                Response::Export { json }
            }
        }
    }

    fn patch_list(&self) -> Vec<Patch> {
        self.patches
            .iter()
            .map(|(&offset, &value)| Patch::new(offset, value))
            .collect()
    }

    fn buffer_response(&self) -> Response {
        let mut bytes = self.base.clone();
        for (&offset, &value) in &self.patches {
            bytes[offset] = value;
        }
        Response::Buffer {
            bytes,
            patches: self.patch_list(),
        }
    }
}
