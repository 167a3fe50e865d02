//! Internal sensors probe: die temperature and timer precision.

use core::fmt::Write;

use super::{footer, heading};
use crate::app::ports::{ClockPort, ProbeId};

/// Requested delay for the timer precision check.
pub const DELAY_CHECK_MS: u32 = 100;
/// Accepted deviation from [`DELAY_CHECK_MS`] in either direction.
pub const DELAY_TOLERANCE_MS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// `None` when the temperature sensor could not be read.
    pub temperature_c: Option<f32>,
    pub uptime_ms: u64,
    pub uptime_us: u64,
    pub delay_measured_ms: u64,
}

pub fn temperature_band(celsius: f32) -> &'static str {
    if celsius > 80.0 {
        "very high"
    } else if celsius > 60.0 {
        "elevated"
    } else {
        "normal"
    }
}

#[cfg(target_os = "espidf")]
fn read_temperature() -> Option<f32> {
    use esp_idf_svc::sys::*;

    const OK: esp_err_t = ESP_OK as esp_err_t;

    let cfg = temperature_sensor_config_t {
        range_min: -10,
        range_max: 80,
        clk_src: soc_periph_temperature_sensor_clk_src_t_TEMPERATURE_SENSOR_CLK_SRC_DEFAULT,
        ..Default::default()
    };
    let mut handle: temperature_sensor_handle_t = core::ptr::null_mut();
    let mut celsius: f32 = 0.0;

    // SAFETY: the handle is installed, used and released within this call.
    unsafe {
        let ret = temperature_sensor_install(&cfg, &mut handle);
        if ret != OK {
            log::warn!("sensors: temperature_sensor_install failed ({})", ret);
            return None;
        }
        let mut ok = temperature_sensor_enable(handle) == OK;
        if ok {
            ok = temperature_sensor_get_celsius(handle, &mut celsius) == OK;
            temperature_sensor_disable(handle);
        }
        temperature_sensor_uninstall(handle);
        ok.then_some(celsius)
    }
}

#[cfg(not(target_os = "espidf"))]
fn read_temperature() -> Option<f32> {
    Some(42.5)
}

/// Sample the sensors.  Spends [`DELAY_CHECK_MS`] in `clock.settle`.
pub fn read(clock: &mut dyn ClockPort) -> SensorReading {
    let temperature_c = read_temperature();
    let uptime_us = clock.uptime_us();
    let before = clock.uptime_ms();
    clock.settle(DELAY_CHECK_MS);
    let delay_measured_ms = clock.uptime_ms().saturating_sub(before);
    SensorReading {
        temperature_c,
        uptime_ms: uptime_us / 1000,
        uptime_us,
        delay_measured_ms,
    }
}

pub fn run(clock: &mut dyn ClockPort) -> String {
    report(&read(clock))
}

pub fn report(r: &SensorReading) -> String {
    let mut out = heading(ProbeId::Sensors);
    let _ = writeln!(out, "Temperature:");
    match r.temperature_c {
        Some(c) => {
            let _ = writeln!(out, "  Die:          {:.1} C ({})", c, temperature_band(c));
        }
        None => {
            let _ = writeln!(out, "  Die:          unavailable");
        }
    }

    let _ = writeln!(out, "Timers:");
    let _ = writeln!(out, "  Uptime:       {} ms", r.uptime_ms);
    let _ = writeln!(out, "  Uptime:       {} us", r.uptime_us);

    let expected = u64::from(DELAY_CHECK_MS);
    let _ = write!(
        out,
        "  Delay {} ms:  measured {} ms",
        DELAY_CHECK_MS, r.delay_measured_ms
    );
    if r.delay_measured_ms.abs_diff(expected) <= DELAY_TOLERANCE_MS {
        let _ = writeln!(out, " (ok)");
    } else {
        let deviation = r.delay_measured_ms as i64 - expected as i64;
        let _ = writeln!(out, " (off by {:+} ms)", deviation);
    }
    out.push_str(&footer(ProbeId::Sensors));
    out
}
