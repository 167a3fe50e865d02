//! Hardware probes.
//!
//! Each probe module follows the same shape: a `*Reading` struct, a
//! dual-target `read()` (ESP-IDF calls on the device, fixed values on the
//! host) and a pure `report()` that renders the reading as text.  Probes
//! that need timed steps take the [`ClockPort`] and spend every wait in
//! `settle`, which keeps the watchdog fed.
//!
//! [`HardwareProbes`] is the [`ProbePort`] the firmware wires into the
//! service.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::adapters::ble::BleScanner;
use crate::adapters::wifi::WifiRadio;
use crate::app::ports::{ClockPort, ProbeId, ProbePort};
use crate::config::SystemConfig;

pub mod benchmark;
pub mod chip;
pub mod leds;
pub mod memory;
pub mod peers;
pub mod sensors;
pub mod system;
pub mod wifi_scan;

/// Section heading shared by every report.
pub fn heading(probe: ProbeId) -> String {
    let title = probe.title();
    format!("\n{}\n{}\n", title, "=".repeat(title.len()))
}

/// Closing line shared by every report.
pub fn footer(probe: ProbeId) -> String {
    format!("[done] {}\n", probe.tag())
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub struct HardwareProbes {
    radio: Rc<RefCell<WifiRadio>>,
    ble: BleScanner,
    wifi_max_listed: u8,
    peer_window_secs: u8,
}

impl HardwareProbes {
    pub fn new(radio: Rc<RefCell<WifiRadio>>, config: &SystemConfig) -> Self {
        Self {
            radio,
            ble: BleScanner::new(),
            wifi_max_listed: config.wifi_scan_max_listed,
            peer_window_secs: config.peer_scan_window_secs,
        }
    }
}

impl ProbePort for HardwareProbes {
    fn run(&mut self, probe: ProbeId, clock: &mut dyn ClockPort) -> String {
        debug!("probe {} starting", probe);
        match probe {
            ProbeId::Chip => chip::report(&chip::read()),
            ProbeId::Memory => memory::report(&memory::read()),
            ProbeId::WifiScan => {
                wifi_scan::run(&mut self.radio.borrow_mut(), self.wifi_max_listed, clock)
            }
            ProbeId::PinTest => pin_test::run(clock),
            ProbeId::System => system::report(&system::read(clock)),
            ProbeId::Sensors => sensors::run(clock),
            ProbeId::LedTest => leds::run(clock),
            ProbeId::Benchmark => benchmark::run(clock),
            ProbeId::PeerScan => peers::run(&mut self.ble, self.peer_window_secs, clock),
        }
    }
}
