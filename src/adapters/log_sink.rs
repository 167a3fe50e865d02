//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one `TAG | key=value` line per
//! application event to the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                capture_capacity,
                snapshot_capacity,
            } => {
                info!(
                    "START | capture={}B snapshot={}B",
                    capture_capacity, snapshot_capacity
                );
            }
            AppEvent::BackupFound { bytes } => {
                info!("BOOT  | nvs_backup={}B", bytes);
            }
            AppEvent::CommandAccepted(name) => {
                info!("CMD   | {}", name);
            }
            AppEvent::UnknownCommand(token) => {
                info!("CMD   | unknown token={:?}", token);
            }
            AppEvent::ProbeCompleted {
                probe,
                bytes,
                elapsed_ms,
            } => {
                info!(
                    "PROBE | {} | report={}B | {}ms",
                    probe, bytes, elapsed_ms
                );
            }
            AppEvent::FullRunStarted => {
                info!("RUN   | full diagnostic started");
            }
            AppEvent::FullRunCompleted {
                probes,
                captured,
                elapsed_ms,
            } => {
                info!(
                    "RUN   | complete probes={} captured={}B | {}ms",
                    probes, captured, elapsed_ms
                );
            }
            AppEvent::CaptureTruncated { kept, dropped } => {
                warn!("CAPT  | truncated kept={}B dropped={}B", kept, dropped);
            }
            AppEvent::CaptureCleared => {
                info!("CAPT  | cleared");
            }
            AppEvent::SnapshotSaved { bytes } => {
                info!("NVS   | snapshot={}B", bytes);
            }
            AppEvent::SnapshotFailed(e) => {
                warn!("NVS   | snapshot failed: {}", e);
            }
            AppEvent::ExportWritten { path, bytes } => {
                info!("FS    | export {} ({}B)", path, bytes);
            }
            AppEvent::ExportFailed(e) => {
                warn!("FS    | export failed: {}", e);
            }
            AppEvent::NothingToExport => {
                info!("FS    | nothing to export");
            }
            AppEvent::FileServiceStarted(addr) => {
                info!("HTTP  | listening on {}", addr);
            }
            AppEvent::FileServiceFailed(e) => {
                warn!("HTTP  | start failed: {}", e);
            }
            AppEvent::HttpServed {
                method,
                path,
                status,
            } => {
                info!("HTTP  | {} {} -> {}", method, path, status);
            }
            AppEvent::PowerRequested { sleep } => {
                info!("POWER | {}", if *sleep { "deep sleep" } else { "restart" });
            }
        }
    }
}
