//! System configuration parameters
//!
//! All tunable parameters for the diagnostic console.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Capture ---
    /// Capture buffer size in bytes (one byte is reserved for the terminator)
    pub capture_capacity: u32,
    /// NVS backup slot size in bytes
    pub snapshot_capacity: u32,

    // --- Timing ---
    /// Sleep between run-loop iterations (milliseconds)
    pub loop_interval_ms: u32,
    /// Settle delay inserted between probes in a full run (milliseconds)
    pub probe_settle_ms: u32,
    /// Delay between the `reset` announcement and the restart (milliseconds)
    pub restart_delay_ms: u32,
    /// Delay between the `sleep` announcement and deep sleep (milliseconds)
    pub sleep_delay_ms: u32,
    /// Task watchdog period (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- File service ---
    /// SoftAP SSID
    pub ap_ssid: heapless::String<32>,
    /// SoftAP WPA2 passphrase
    pub ap_password: heapless::String<64>,
    /// HTTP listener port
    pub http_port: u16,

    // --- Probes ---
    /// Networks itemised in the wifi scan report
    pub wifi_scan_max_listed: u8,
    /// BLE discovery window (seconds)
    pub peer_scan_window_secs: u8,

    // --- Storage ---
    /// Mount point of the hierarchical file store
    pub fs_base_path: heapless::String<32>,
    /// Reported capacity of host-backed file stores (bytes)
    pub fs_capacity_bytes: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Capture
            capture_capacity: 8192,
            snapshot_capacity: 4000,

            // Timing
            loop_interval_ms: 100,
            probe_settle_ms: 1000,
            restart_delay_ms: 1000,
            sleep_delay_ms: 500,
            watchdog_timeout_ms: 30_000,

            // File service
            ap_ssid: heapless_str("ESP32-Diag"),
            ap_password: heapless_str("diagnostico"),
            http_port: 80,

            // Probes
            wifi_scan_max_listed: 8,
            peer_scan_window_secs: 5,

            // Storage
            fs_base_path: heapless_str("/storage"),
            fs_capacity_bytes: 1024 * 1024,
        }
    }
}

/// Build a fixed-capacity string, truncating at the capacity if needed.
pub(crate) fn heapless_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
