//! Boot, clock and power state probe.

use core::fmt::Write;

use super::{footer, heading};
use crate::app::ports::{ClockPort, ProbeId};

/// The ESP32-C3 runs from a 40 MHz crystal only.
pub const XTAL_MHZ: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemReading {
    pub reset_reason: &'static str,
    pub uptime_ms: u64,
    pub cpu_mhz: u32,
    pub xtal_mhz: u32,
    pub wakeup_cause: &'static str,
}

#[cfg(target_os = "espidf")]
#[allow(non_upper_case_globals)]
fn reset_reason() -> &'static str {
    use esp_idf_svc::sys::*;
    // SAFETY: read-only query.
    match unsafe { esp_reset_reason() } {
        esp_reset_reason_t_ESP_RST_POWERON => "power-on",
        esp_reset_reason_t_ESP_RST_EXT => "external pin",
        esp_reset_reason_t_ESP_RST_SW => "software restart",
        esp_reset_reason_t_ESP_RST_PANIC => "panic",
        esp_reset_reason_t_ESP_RST_INT_WDT => "interrupt watchdog",
        esp_reset_reason_t_ESP_RST_TASK_WDT => "task watchdog",
        esp_reset_reason_t_ESP_RST_WDT => "other watchdog",
        esp_reset_reason_t_ESP_RST_DEEPSLEEP => "deep sleep wake",
        esp_reset_reason_t_ESP_RST_BROWNOUT => "brownout",
        esp_reset_reason_t_ESP_RST_SDIO => "SDIO",
        _ => "unknown",
    }
}

#[cfg(target_os = "espidf")]
#[allow(non_upper_case_globals)]
fn wakeup_cause() -> &'static str {
    use esp_idf_svc::sys::*;
    // SAFETY: read-only query.
    match unsafe { esp_sleep_get_wakeup_cause() } {
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => "none (not a sleep wake)",
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => "timer",
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO => "GPIO",
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UART => "UART",
        _ => "other",
    }
}

#[cfg(target_os = "espidf")]
pub fn read(clock: &dyn ClockPort) -> SystemReading {
    // SAFETY: read-only ROM query.
    let cpu_mhz = unsafe { esp_idf_svc::sys::esp_rom_get_cpu_ticks_per_us() };
    SystemReading {
        reset_reason: reset_reason(),
        uptime_ms: clock.uptime_ms(),
        cpu_mhz,
        xtal_mhz: XTAL_MHZ,
        wakeup_cause: wakeup_cause(),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn read(clock: &dyn ClockPort) -> SystemReading {
    SystemReading {
        reset_reason: "power-on",
        uptime_ms: clock.uptime_ms(),
        cpu_mhz: 160,
        xtal_mhz: XTAL_MHZ,
        wakeup_cause: "none (not a sleep wake)",
    }
}

pub fn report(r: &SystemReading) -> String {
    let mut out = heading(ProbeId::System);
    let _ = writeln!(out, "Boot:");
    let _ = writeln!(out, "  Reset reason: {}", r.reset_reason);
    let _ = writeln!(out, "  Uptime:       {} s", r.uptime_ms / 1000);
    let _ = writeln!(out, "Clocks:");
    let _ = writeln!(out, "  CPU:          {} MHz", r.cpu_mhz);
    let _ = writeln!(out, "  XTAL:         {} MHz", r.xtal_mhz);
    let _ = writeln!(out, "Power:");
    let _ = writeln!(out, "  Wake-up:      {}", r.wakeup_cause);
    let _ = writeln!(out, "  Mode:         active");
    out.push_str(&footer(ProbeId::System));
    out
}
