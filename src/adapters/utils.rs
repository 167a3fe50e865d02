//! Shared utilities for adapter-layer validation.
//!
//! Used by the NVS config validator and the SoftAP bring-up.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validate a SoftAP SSID / WPA2 passphrase pair.
pub(super) fn valid_ap_credentials(ssid: &str, password: &str) -> bool {
    (1..=32).contains(&ssid.len())
        && is_printable_ascii(ssid)
        && (8..=63).contains(&password.len())
}
