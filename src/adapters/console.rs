//! Serial console adapter.
//!
//! Implements [`ConsolePort`] over the ESP-IDF stdio console (UART0 or
//! USB-Serial-JTAG, whichever `sdkconfig` routes stdio to).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: stdin is switched to `O_NONBLOCK` with
//!   `fcntl`, so each poll reads whatever bytes the VFS driver holds.
//! - **all other targets**: a reader thread forwards stdin bytes over an
//!   `mpsc` channel; `poll_line` drains the channel without blocking.
//!
//! Bytes are assembled into lines by [`LineAssembler`].

use std::io::Write;

use log::warn;

use crate::app::ports::ConsolePort;

/// Longest accepted command line, in bytes.
pub const MAX_LINE_LEN: usize = 64;

// ───────────────────────────────────────────────────────────────
// Line assembly
// ───────────────────────────────────────────────────────────────

/// Accumulates raw console bytes into complete lines.
///
/// - CR, LF and CRLF all terminate a line; the LF of a CRLF pair does not
///   produce a second (empty) line.
/// - A line longer than [`MAX_LINE_LEN`] is discarded whole, up to and
///   including its terminator.
/// - Non-UTF-8 lines are decoded lossily.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: heapless::Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
    last_was_cr: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.  Returns a completed line, which may be empty.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        let after_cr = core::mem::replace(&mut self.last_was_cr, byte == b'\r');
        match byte {
            b'\n' if after_cr => None,
            b'\r' | b'\n' => {
                let overflowed = core::mem::replace(&mut self.overflowed, false);
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                if overflowed {
                    warn!("Console: line longer than {} bytes discarded", MAX_LINE_LEN);
                    return None;
                }
                Some(line)
            }
            _ => {
                if !self.overflowed && self.buf.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Bytes of the line currently being assembled.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// ───────────────────────────────────────────────────────────────
// Console adapter
// ───────────────────────────────────────────────────────────────

pub struct SerialConsole {
    assembler: LineAssembler,
    #[cfg(not(target_os = "espidf"))]
    rx: std::sync::mpsc::Receiver<u8>,
}

impl SerialConsole {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: fd 0 is the VFS console, opened by ESP-IDF before app_main.
        unsafe {
            let flags = esp_idf_svc::sys::fcntl(0, esp_idf_svc::sys::F_GETFL as i32);
            if flags < 0
                || esp_idf_svc::sys::fcntl(
                    0,
                    esp_idf_svc::sys::F_SETFL as i32,
                    flags | esp_idf_svc::sys::O_NONBLOCK as i32,
                ) < 0
            {
                warn!("Console: could not make stdin non-blocking");
            }
        }
        Self {
            assembler: LineAssembler::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        use std::io::Read;

        let (tx, rx) = std::sync::mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("console-stdin".into())
            .spawn(move || {
                for byte in std::io::stdin().lock().bytes() {
                    let Ok(byte) = byte else { break };
                    if tx.send(byte).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("Console(sim): stdin reader not started: {}", e);
        }
        Self {
            assembler: LineAssembler::new(),
            rx,
        }
    }

    #[cfg(target_os = "espidf")]
    fn next_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        // SAFETY: reading one byte into a stack buffer from a non-blocking fd.
        let n = unsafe { esp_idf_svc::sys::read(0, (&mut byte as *mut u8).cast(), 1) };
        (n == 1).then_some(byte)
    }

    #[cfg(not(target_os = "espidf"))]
    fn next_byte(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }
}

impl Default for SerialConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePort for SerialConsole {
    fn poll_line(&mut self) -> Option<String> {
        while let Some(byte) = self.next_byte() {
            if let Some(line) = self.assembler.push(byte) {
                if !line.trim().is_empty() {
                    return Some(line);
                }
            }
        }
        None
    }

    fn write_str(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}
