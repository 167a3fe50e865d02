//! Device identity derived from the ESP32 factory MAC address.
//!
//! - `chip_id` packs the last 3 MAC bytes into an integer (the number the
//!   chip report prints).
//! - `device_id` renders the same bytes as `CS-XXYYZZ` for log lines.
//! - `format_mac` renders the full address as `AA:BB:CC:DD:EE:FF`.

use core::fmt::Write;

/// Fixed-size device ID string: "CS-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Last 3 MAC bytes as a 24-bit integer.
pub fn chip_id(mac: &MacAddress) -> u32 {
    (u32::from(mac[3]) << 16) | (u32::from(mac[4]) << 8) | u32::from(mac[5])
}

/// Short device ID from the last 3 MAC bytes.
/// Format: `CS-XXYYZZ` (e.g., `CS-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "CS-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Colon-separated uppercase hex.
pub fn format_mac(mac: &MacAddress) -> heapless::String<18> {
    let mut s = heapless::String::<18>::new();
    let _ = write!(
        s,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    s
}
