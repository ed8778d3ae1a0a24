//! Offloaded byte processing.
//!
//! Heavy byte-array work (materializing a large hex source, applying patch
//! sets) can be delegated to a background task so an interactive surface
//! stays responsive. The processor is a typed request/response channel:
//! requests go in, responses come back in request order (FIFO), and the
//! owning surface reintegrates them without ever seeing the execution
//! strategy.
//!
//! Two implementations satisfy [`ByteProcessor`]: a tokio-task worker
//! ([`task::TaskProcessor`]) and a synchronous fallback
//! ([`sync::SyncProcessor`]) used when no runtime can be built. Selection
//! happens once at construction via [`spawn_or_sync`], not at call sites.

pub mod ops;
pub mod sync;
pub mod task;

use tracing::warn;

use crate::core::Patch;

pub use sync::SyncProcessor;
pub use task::TaskProcessor;

/// Work the processor accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Materialize a hex source into a byte image, resetting patch state.
    LoadBuffer { hex: String },
    /// Record one byte override and rematerialize the patched image.
    ApplyPatch { offset: usize, value: u8 },
    /// Serialize the current patch set to pretty JSON.
    ExportPatches,
}

/// Results the processor produces, one per request, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The patched byte image and the patch list behind it.
    Buffer { bytes: Vec<u8>, patches: Vec<Patch> },
    /// The exported patch JSON.
    Export { json: String },
}

/// Processor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// No work outstanding.
    Idle,
    /// Requests submitted and not yet reintegrated.
    Running,
    /// Requests are queued, not processed, until resume.
    Paused,
}

/// A pausable request/response byte processor.
///
/// While paused, submitted requests are queued rather than dropped; resume
/// drains the queue in order. Responses are reintegrated in the order their
/// requests were issued.
pub trait ByteProcessor: Send {
    /// Queue a request for processing.
    fn submit(&mut self, request: Request);
    /// Stop processing new requests; queue them instead.
    fn pause(&mut self);
    /// Resume processing, draining anything queued while paused.
    fn resume(&mut self);
    /// Current lifecycle state.
    fn state(&self) -> ProcessorState;
    /// Next response if one is ready, without blocking.
    fn try_recv(&mut self) -> Option<Response>;
    /// Next response, waiting for it if necessary. `None` when nothing is
    /// outstanding.
    fn recv(&mut self) -> Option<Response>;
}

/// Build a background processor, falling back to synchronous execution when
/// no runtime is available. The fallback is transparent to callers.
pub fn spawn_or_sync() -> Box<dyn ByteProcessor> {
    match TaskProcessor::spawn() {
        Ok(processor) => Box::new(processor),
        Err(err) => {
            warn!(error = %err, "background runtime unavailable; processing synchronously");
            Box::new(SyncProcessor::new())
        }
    }
}
