//! Tokio-task-backed processor.
//!
//! One dedicated worker task owns the processor state and handles commands
//! from an unbounded channel. A single task plus a single response channel
//! gives first-in-first-out reintegration for free, which the overlay's
//! linear-undo invariant depends on.

use std::collections::VecDeque;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::debug;

use crate::worker::ops::WorkerCore;
use crate::worker::{ByteProcessor, ProcessorState, Request, Response};

#[derive(Debug)]
enum Command {
    Request(Request),
    Pause,
    Resume,
}

/// Background processor running on its own single-threaded tokio runtime.
pub struct TaskProcessor {
    // Held so the worker task outlives the handle; dropped last.
    _runtime: Runtime,
    commands: mpsc::UnboundedSender<Command>,
    responses: mpsc::UnboundedReceiver<Response>,
    in_flight: usize,
    paused: bool,
}

impl TaskProcessor {
    /// Build the runtime and start the worker task.
    pub fn spawn() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("hexpatch-worker")
            .enable_time()
            .build()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        runtime.spawn(run(command_rx, response_tx));
        debug!("background processor started");
        Ok(Self {
            _runtime: runtime,
            commands: command_tx,
            responses: response_rx,
            in_flight: 0,
            paused: false,
        })
    }

    fn send(&self, command: Command) {
        // The worker task only exits when the handle is dropped, so a send
        // failure here is unreachable in practice; ignore it.
        let _ = self.commands.send(command);
    }
}

impl ByteProcessor for TaskProcessor {
    fn submit(&mut self, request: Request) {
        self.in_flight += 1;
        self.send(Command::Request(request));
    }

    fn pause(&mut self) {
        self.paused = true;
        self.send(Command::Pause);
    }

    fn resume(&mut self) {
        self.paused = false;
        self.send(Command::Resume);
    }

    fn state(&self) -> ProcessorState {
        if self.paused {
            ProcessorState::Paused
        } else if self.in_flight > 0 {
            ProcessorState::Running
        } else {
            ProcessorState::Idle
        }
    }

    fn try_recv(&mut self) -> Option<Response> {
        match self.responses.try_recv() {
            Ok(response) => {
                self.in_flight -= 1;
                Some(response)
            }
            Err(_) => None,
        }
    }

    fn recv(&mut self) -> Option<Response> {
        if self.in_flight == 0 {
            return None;
        }
        let response = self.responses.blocking_recv()?;
        self.in_flight -= 1;
        Some(response)
    }
}

async fn run(mut commands: mpsc::UnboundedReceiver<Command>, responses: mpsc::UnboundedSender<Response>) {
    let mut core = WorkerCore::default();
    let mut paused = false;
    let mut backlog: VecDeque<Request> = VecDeque::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Pause => paused = true,
            Command::Resume => {
                paused = false;
                while let Some(request) = backlog.pop_front() {
                    if responses.send(core.handle(request)).is_err() {
                        return;
                    }
                }
            }
            Command::Request(request) => {
                if paused {
                    backlog.push_back(request);
                } else if responses.send(core.handle(request)).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut processor = TaskProcessor::spawn().unwrap();
        processor.submit(Request::LoadBuffer {
            hex: "554889e5".to_string(),
        });
        match processor.recv().unwrap() {
            Response::Buffer { bytes, .. } => {
                assert_eq!(bytes, vec![0x55, 0x48, 0x89, 0xe5]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(processor.state(), ProcessorState::Idle);
    }

    #[test]
    fn test_fifo_reintegration() {
        let mut processor = TaskProcessor::spawn().unwrap();
        processor.submit(Request::LoadBuffer {
            hex: "00".to_string(),
        });
        for value in [0x11u8, 0x22, 0x33] {
            processor.submit(Request::ApplyPatch { offset: 0, value });
        }
        // Skip the load response, then observe patches land in issue order
        processor.recv().unwrap();
        for expected in [0x11u8, 0x22, 0x33] {
            match processor.recv().unwrap() {
                Response::Buffer { bytes, .. } => assert_eq!(bytes, vec![expected]),
                other => panic!("unexpected response: {other:?}"),
            }
        }
    }

    #[test]
    fn test_pause_queues_until_resume() {
        let mut processor = TaskProcessor::spawn().unwrap();
        processor.submit(Request::LoadBuffer {
            hex: "00".to_string(),
        });
        processor.recv().unwrap();

        processor.pause();
        assert_eq!(processor.state(), ProcessorState::Paused);
        processor.submit(Request::ApplyPatch {
            offset: 0,
            value: 0xff,
        });

        processor.resume();
        match processor.recv().unwrap() {
            Response::Buffer { bytes, .. } => assert_eq!(bytes, vec![0xff]),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_recv_without_outstanding_work() {
        let mut processor = TaskProcessor::spawn().unwrap();
        assert!(processor.recv().is_none());
        assert!(processor.try_recv().is_none());
    }
}
