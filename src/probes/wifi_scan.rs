//! WiFi station scan probe.

use core::fmt::Write;

use super::{footer, heading};
use crate::adapters::device_id::{self, MacAddress};
use crate::adapters::wifi::{ScannedNetwork, WifiRadio};
use crate::app::ports::{ClockPort, NetError, ProbeId};

/// Wait before scanning so a radio that was just reconfigured settles.
pub const RADIO_SETTLE_MS: u32 = 300;

/// Signal quality bucket for an RSSI in dBm.
pub fn rssi_quality(rssi: i8) -> &'static str {
    match rssi {
        r if r > -30 => "excellent",
        r if r > -50 => "very good",
        r if r > -60 => "good",
        r if r > -70 => "fair",
        _ => "weak",
    }
}

pub fn run(radio: &mut WifiRadio, max_listed: u8, clock: &mut dyn ClockPort) -> String {
    clock.settle(RADIO_SETTLE_MS);
    let result = radio.scan();
    report(&device_id::read_mac(), result.as_deref(), usize::from(max_listed))
}

pub fn report(
    station_mac: &MacAddress,
    result: Result<&[ScannedNetwork], &NetError>,
    max_listed: usize,
) -> String {
    let mut out = heading(ProbeId::WifiScan);
    let _ = writeln!(out, "Station MAC: {}", device_id::format_mac(station_mac));
    let _ = writeln!(out, "Mode:        station (STA)");

    match result {
        Err(e) => {
            let _ = writeln!(out, "Scan failed: {}", e);
        }
        Ok([]) => {
            let _ = writeln!(out, "No networks found");
        }
        Ok(networks) => {
            let _ = writeln!(out, "Networks found: {}", networks.len());
            for (i, n) in networks.iter().take(max_listed).enumerate() {
                let ssid = if n.ssid.is_empty() { "(hidden)" } else { n.ssid.as_str() };
                let _ = writeln!(out, "  {}. {}", i + 1, ssid);
                let _ = writeln!(
                    out,
                    "     {} | {} ({} dBm) | ch {}",
                    n.auth.label(),
                    rssi_quality(n.rssi),
                    n.rssi,
                    n.channel
                );
            }
            if networks.len() > max_listed {
                let _ = writeln!(out, "  ... and {} more", networks.len() - max_listed);
            }
        }
    }
    out.push_str(&footer(ProbeId::WifiScan));
    out
}
