//! Process-wide session state.
//!
//! Created once at boot and owned by the [`AppService`](super::service::AppService);
//! lives until restart.  Everything here is mutated only from the run loop.

use std::net::SocketAddrV4;

use super::capture::CaptureBuffer;
use super::ports::ProbeId;

/// What the orchestrator is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RunningSingle(ProbeId),
    RunningFull,
}

pub struct Session {
    capture: CaptureBuffer,
    pub(crate) state: RunState,
    pub(crate) diagnostics_complete: bool,
    pub(crate) file_service: Option<SocketAddrV4>,
}

impl Session {
    pub fn new(capture_capacity: usize) -> Self {
        Self {
            capture: CaptureBuffer::new(capture_capacity),
            state: RunState::Idle,
            diagnostics_complete: false,
            file_service: None,
        }
    }

    pub fn capture(&self) -> &CaptureBuffer {
        &self.capture
    }

    pub(crate) fn capture_mut(&mut self) -> &mut CaptureBuffer {
        &mut self.capture
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Set by a full run that reached its end marker; cleared by the next
    /// full run or a manual clear.
    pub fn diagnostics_complete(&self) -> bool {
        self.diagnostics_complete
    }

    pub fn file_service_active(&self) -> bool {
        self.file_service.is_some()
    }

    /// Address the file service listens on, once started.
    pub fn file_service_addr(&self) -> Option<SocketAddrV4> {
        self.file_service
    }
}
