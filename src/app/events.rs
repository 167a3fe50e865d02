//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  They are the log-side
//! record of what happened; the operator sees report text on the console.

use std::net::SocketAddrV4;

use super::ports::{FsError, NetError, ProbeId, StorageError};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service is up and the capture buffer is allocated.
    Started { capture_capacity: usize, snapshot_capacity: usize },

    /// A previous session's backup blob was found at boot.
    BackupFound { bytes: usize },

    /// A recognised command is about to run.
    CommandAccepted(&'static str),

    /// Input did not match any command.
    UnknownCommand(String),

    /// One probe finished and its report was captured.
    ProbeCompleted { probe: ProbeId, bytes: usize, elapsed_ms: u64 },

    /// A full run cleared the capture buffer and began.
    FullRunStarted,

    /// A full run appended its end marker.
    FullRunCompleted { probes: usize, captured: usize, elapsed_ms: u64 },

    /// An append lost data because the capture buffer is full.
    CaptureTruncated { kept: usize, dropped: usize },

    /// The operator cleared the capture buffer.
    CaptureCleared,

    /// The capture buffer was copied into the NVS slot.
    SnapshotSaved { bytes: usize },

    /// The NVS slot could not be written.
    SnapshotFailed(StorageError),

    /// An export file was created.
    ExportWritten { path: String, bytes: u64 },

    /// The export file could not be created; the console fallback ran.
    ExportFailed(FsError),

    /// Export was requested with an empty capture buffer.
    NothingToExport,

    /// The SoftAP and HTTP listener are up.
    FileServiceStarted(SocketAddrV4),

    /// The SoftAP or listener failed to start.
    FileServiceFailed(NetError),

    /// One HTTP request was answered.
    HttpServed { method: String, path: String, status: u16 },

    /// The operator asked for a restart or deep sleep.
    PowerRequested { sleep: bool },
}
