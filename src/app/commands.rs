//! Operator commands.
//!
//! One token per input line, matched case-insensitively.  The
//! [`AppService`](super::service::AppService) interprets each [`Command`].

use super::ports::ProbeId;

/// Commands the operator can type at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one probe (`1`..`8`, `A`).
    Probe(ProbeId),

    /// Clear the capture buffer and run every probe in order (`9`).
    FullRun,

    /// Write the capture buffer to a file and the NVS slot (`X`).
    Export,

    /// List persisted files with a content preview (`Y`).
    ListFiles,

    /// Start the SoftAP and HTTP file service (`W`).
    StartFileService,

    /// Clear the capture buffer (`C`).
    ClearHistory,

    /// Show the menu (`help`, `h`).
    Help,

    /// Restart the device (`reset`).
    Reset,

    /// Enter deep sleep until external reset (`sleep`).
    Sleep,

    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse one input line.  Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let token = line.trim();
        if token.is_empty() {
            return None;
        }

        let cmd = match token.to_ascii_lowercase().as_str() {
            "1" => Self::Probe(ProbeId::Chip),
            "2" => Self::Probe(ProbeId::Memory),
            "3" => Self::Probe(ProbeId::WifiScan),
            "4" => Self::Probe(ProbeId::PinTest),
            "5" => Self::Probe(ProbeId::System),
            "6" => Self::Probe(ProbeId::Sensors),
            "7" => Self::Probe(ProbeId::LedTest),
            "8" => Self::Probe(ProbeId::Benchmark),
            "a" => Self::Probe(ProbeId::PeerScan),
            "9" => Self::FullRun,
            "x" => Self::Export,
            "y" => Self::ListFiles,
            "w" => Self::StartFileService,
            "c" => Self::ClearHistory,
            "help" | "h" => Self::Help,
            "reset" => Self::Reset,
            "sleep" => Self::Sleep,
            _ => Self::Unknown(token.to_string()),
        };
        Some(cmd)
    }

    /// Short name for log records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe(_) => "probe",
            Self::FullRun => "full_run",
            Self::Export => "export",
            Self::ListFiles => "list_files",
            Self::StartFileService => "file_service",
            Self::ClearHistory => "clear",
            Self::Help => "help",
            Self::Reset => "reset",
            Self::Sleep => "sleep",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Console menu shown at boot and on `help`.
pub const MENU: &str = "
==================== CHIPSCOPE ====================
 1  chip information        6  internal sensors
 2  memory analysis         7  LED test
 3  wifi scan               8  performance benchmark
 4  GPIO test               9  FULL DIAGNOSTIC
 5  system information      A  BLE scan
---------------------------------------------------
 X  export capture to file  Y  list saved files
 W  start file service      C  clear capture
 help / h   this menu
 reset      restart device
 sleep      deep sleep (external reset to wake)
===================================================
";
