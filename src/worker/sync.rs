//! Synchronous processor fallback.
//!
//! Used when no background runtime is available: requests are computed
//! inline on the caller's thread, so every call blocks but the observable
//! behavior (responses, ordering, pause queueing) matches the task-backed
//! processor exactly.

use std::collections::VecDeque;

use crate::worker::ops::WorkerCore;
use crate::worker::{ByteProcessor, ProcessorState, Request, Response};

/// Inline processor satisfying [`ByteProcessor`].
#[derive(Debug, Default)]
pub struct SyncProcessor {
    core: WorkerCore,
    backlog: VecDeque<Request>,
    pending: VecDeque<Response>,
    paused: bool,
}

impl SyncProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteProcessor for SyncProcessor {
    fn submit(&mut self, request: Request) {
        if self.paused {
            self.backlog.push_back(request);
        } else {
            let response = self.core.handle(request);
            self.pending.push_back(response);
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
        while let Some(request) = self.backlog.pop_front() {
            let response = self.core.handle(request);
            self.pending.push_back(response);
        }
    }

    fn state(&self) -> ProcessorState {
        if self.paused {
            ProcessorState::Paused
        } else if self.pending.is_empty() {
            ProcessorState::Idle
        } else {
            ProcessorState::Running
        }
    }

    fn try_recv(&mut self) -> Option<Response> {
        self.pending.pop_front()
    }

    fn recv(&mut self) -> Option<Response> {
        self.pending.pop_front()
    }
}
