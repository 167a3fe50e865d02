//! Persistence of the capture buffer.
//!
//! Two sinks:
//!
//! | Sink | Port | Content |
//! |------|------|---------|
//! | durable snapshot | [`StoragePort`] | first `min(L, K-1)` bytes + `\0`, one slot, overwritten |
//! | export file | [`FileStorePort`] | header + `L` bytes + footer, new file per export |
//!
//! An export that cannot reach the file store still lands in the snapshot
//! slot and is dumped to the console between copy markers.

use core::fmt::Write as _;

use log::{error, info, warn};

use super::capture::CaptureBuffer;
use super::events::AppEvent;
use super::ports::{ConsolePort, EventSink, FileStorePort, FsError, StorageError, StoragePort};

pub const SNAPSHOT_NAMESPACE: &str = "diag";
pub const SNAPSHOT_KEY: &str = "last_run";

/// Export files are named `/<prefix><elapsed_ms>[-n].txt`.
pub const EXPORT_PREFIX: &str = "/diagnostico_";
const EXPORT_SUFFIX: &str = ".txt";

/// Highest `-n` suffix tried before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Bytes of content shown per file by [`PersistenceLayer::render_listing`].
pub const PREVIEW_BYTES: usize = 160;

const RULE: &str = "==============================================";

pub const COPY_BEGIN: &str = "\n----- BEGIN CAPTURE (copy from here) -----\n";
pub const COPY_END: &str = "\n----- END CAPTURE -----\n";

/// Result of [`PersistenceLayer::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A new file was created.
    Written { path: String, bytes: u64, snapshot_saved: bool },
    /// The capture buffer was empty; nothing was written anywhere.
    NothingToExport,
    /// The file store failed; the snapshot and console dump ran instead.
    FellBack { error: FsError, snapshot_saved: bool },
}

/// Header written before the captured bytes.
pub fn export_header(path: &str, elapsed_ms: u64, truncated: bool) -> String {
    let mut h = String::with_capacity(256);
    let _ = write!(
        h,
        "{RULE}\n CHIPSCOPE DIAGNOSTIC EXPORT\n Tool: chipscope v{}\n Elapsed: {} ms\n File: {}\n Truncated: {}\n{RULE}\n\n",
        env!("CARGO_PKG_VERSION"),
        elapsed_ms,
        path,
        if truncated { "yes" } else { "no" },
    );
    h
}

/// Footer written after the captured bytes.
pub fn export_footer(captured_len: usize) -> String {
    format!("\n\n{RULE}\n END OF EXPORT ({captured_len} bytes)\n{RULE}\n")
}

/// File name for an export at `elapsed_ms`; `attempt > 0` adds `-attempt`.
pub fn export_file_name(elapsed_ms: u64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{EXPORT_PREFIX}{elapsed_ms}{EXPORT_SUFFIX}")
    } else {
        format!("{EXPORT_PREFIX}{elapsed_ms}-{attempt}{EXPORT_SUFFIX}")
    }
}

pub struct PersistenceLayer {
    snapshot_capacity: usize,
}

impl PersistenceLayer {
    /// `snapshot_capacity` is `K`, the size of the NVS slot including the
    /// terminator.
    pub fn new(snapshot_capacity: usize) -> Self {
        Self {
            snapshot_capacity: snapshot_capacity.max(1),
        }
    }

    pub fn snapshot_capacity(&self) -> usize {
        self.snapshot_capacity
    }

    /// Overwrite the NVS slot with the head of the capture buffer.
    ///
    /// Returns the number of capture bytes stored (terminator excluded).
    pub fn snapshot(
        &self,
        capture: &CaptureBuffer,
        kv: &mut dyn StoragePort,
        sink: &mut dyn EventSink,
    ) -> Result<usize, StorageError> {
        let n = capture.len().min(self.snapshot_capacity - 1);
        let mut blob = Vec::with_capacity(n + 1);
        blob.extend_from_slice(&capture.contents()[..n]);
        blob.push(0);

        match kv.write(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, &blob) {
            Ok(()) => {
                info!("snapshot: {} bytes saved to NVS", n);
                sink.emit(&AppEvent::SnapshotSaved { bytes: n });
                Ok(n)
            }
            Err(e) => {
                error!("snapshot: NVS write failed ({})", e);
                sink.emit(&AppEvent::SnapshotFailed(e));
                Err(e)
            }
        }
    }

    /// Read the NVS slot back, terminator stripped.
    pub fn read_snapshot(&self, kv: &dyn StoragePort) -> Result<Vec<u8>, StorageError> {
        let mut buf = vec![0u8; self.snapshot_capacity];
        let n = kv.read(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, &mut buf)?;
        buf.truncate(n);
        if let Some(end) = buf.iter().position(|&b| b == 0) {
            buf.truncate(end);
        }
        Ok(buf)
    }

    /// Export the capture buffer to a new file, then back it up to NVS.
    pub fn export(
        &self,
        capture: &CaptureBuffer,
        elapsed_ms: u64,
        files: &mut dyn FileStorePort,
        kv: &mut dyn StoragePort,
        console: &mut dyn ConsolePort,
        sink: &mut dyn EventSink,
    ) -> ExportOutcome {
        if capture.is_empty() {
            sink.emit(&AppEvent::NothingToExport);
            return ExportOutcome::NothingToExport;
        }

        match Self::write_export(capture, elapsed_ms, files) {
            Ok((path, bytes)) => {
                info!("export: {} ({} bytes)", path, bytes);
                sink.emit(&AppEvent::ExportWritten {
                    path: path.clone(),
                    bytes,
                });
                let snapshot_saved = self.snapshot(capture, kv, sink).is_ok();
                ExportOutcome::Written {
                    path,
                    bytes,
                    snapshot_saved,
                }
            }
            Err(e) => {
                warn!("export: file store failed ({}), falling back", e);
                sink.emit(&AppEvent::ExportFailed(e));
                let snapshot_saved = self.snapshot(capture, kv, sink).is_ok();
                console.write_str(&format!(
                    "\n[ERROR] cannot write export file: {e}\nNVS backup: {}\nCopy the capture below manually.\n",
                    if snapshot_saved { "saved" } else { "FAILED" },
                ));
                console.write_str(COPY_BEGIN);
                console.write_str(&capture.as_text());
                console.write_str(COPY_END);
                ExportOutcome::FellBack {
                    error: e,
                    snapshot_saved,
                }
            }
        }
    }

    fn write_export(
        capture: &CaptureBuffer,
        elapsed_ms: u64,
        files: &mut dyn FileStorePort,
    ) -> Result<(String, u64), FsError> {
        if !files.is_ready() {
            return Err(FsError::NotMounted);
        }

        let body = capture.contents();
        let footer = export_footer(body.len());

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = export_file_name(elapsed_ms, attempt);
            let header = export_header(&path, elapsed_ms, capture.was_truncated());
            match files.create(&path, &[header.as_bytes(), body, footer.as_bytes()]) {
                Ok(bytes) => return Ok((path, bytes)),
                Err(FsError::AlreadyExists) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(FsError::AlreadyExists)
    }

    /// Operator listing: every file with size and a content preview, then
    /// used/total capacity.
    pub fn render_listing(&self, files: &dyn FileStorePort) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n=== SAVED FILES ===");

        if !files.is_ready() {
            let _ = writeln!(out, "storage unavailable (filesystem not mounted)");
            return out;
        }

        let entries = match files.list() {
            Ok(entries) => entries,
            Err(e) => {
                let _ = writeln!(out, "cannot list files: {e}");
                return out;
            }
        };

        if entries.is_empty() {
            let _ = writeln!(out, "no files saved");
        }

        for entry in &entries {
            let _ = writeln!(out, "\n{}  ({} bytes)", entry.name, entry.size);
            match files.read_prefix(&entry.name, PREVIEW_BYTES) {
                Ok(head) => {
                    let _ = writeln!(out, "--- preview ---");
                    out.push_str(&String::from_utf8_lossy(&head));
                    if entry.size as usize > PREVIEW_BYTES {
                        out.push_str("\n...");
                    }
                    out.push('\n');
                }
                Err(e) => {
                    let _ = writeln!(out, "(unreadable: {e})");
                }
            }
        }

        if let Ok(usage) = files.usage() {
            let _ = writeln!(
                out,
                "\n{} file(s), {} / {} bytes used",
                entries.len(),
                usage.used,
                usage.total
            );
        }
        out
    }
}
