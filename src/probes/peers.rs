//! BLE peer discovery probe.

use core::fmt::Write;

use log::info;

use super::{footer, heading};
use crate::adapters::ble::{BleScanner, PeerSighting, MAX_PEERS};
use crate::app::ports::{ClockPort, ProbeId};

fn peer_line(out: &mut String, index: usize, peer: &PeerSighting) {
    let name = peer.name.as_deref().unwrap_or("(unnamed)");
    let _ = writeln!(
        out,
        "  {:>2}. {}  {:>4} dBm  {}",
        index,
        peer.addr_string(),
        peer.rssi,
        name
    );
}

pub fn run(scanner: &mut BleScanner, window_secs: u8, clock: &mut dyn ClockPort) -> String {
    let mut out = heading(ProbeId::PeerScan);
    let _ = writeln!(out, "Scanning for {} s (active scan)...", window_secs);

    let mut seen = 0usize;
    let result = scanner.scan(window_secs, clock, &mut |peer| {
        seen += 1;
        info!("BLE peer {} rssi={}", peer.addr_string(), peer.rssi);
        peer_line(&mut out, seen, peer);
    });

    match result {
        Ok(0) => {
            let _ = writeln!(out, "No BLE devices found");
        }
        Ok(n) => {
            let _ = writeln!(out, "Devices found: {}", n);
            if n >= MAX_PEERS {
                let _ = writeln!(out, "  (list capped at {})", MAX_PEERS);
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Scan failed: {}", e);
        }
    }
    out.push_str(&footer(ProbeId::PeerScan));
    out
}
