//! Raw GPIO access for the pin, LED and benchmark probes.
//!
//! Uses ESP-IDF `gpio_config` / `gpio_set_level` / `gpio_get_level`
//! directly.  Outputs are configured as input+output so the driven level
//! can be read back.
//!
//! The simulation keeps pin state in a thread-local table (so parallel
//! tests do not see each other's pins) and can mark pins as stuck low to
//! exercise the "problematic" branch of the pin test.

use crate::error::{GpioError, Result};
use crate::pins::MAX_GPIO;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output with the input buffer left on.
    Output,
    /// Floating input.
    Input,
    /// Input with the internal pull-up enabled.
    InputPullup,
}

fn check(pin: i32) -> Result<()> {
    if (0..=MAX_GPIO).contains(&pin) {
        Ok(())
    } else {
        Err(GpioError::InvalidPin(pin).into())
    }
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn configure(pin: i32, mode: PinMode) -> Result<()> {
    check(pin)?;
    let (io_mode, pull_up) = match mode {
        PinMode::Output => (gpio_mode_t_GPIO_MODE_INPUT_OUTPUT, false),
        PinMode::Input => (gpio_mode_t_GPIO_MODE_INPUT, false),
        PinMode::InputPullup => (gpio_mode_t_GPIO_MODE_INPUT, true),
    };
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: io_mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: `cfg` is a valid config for a range-checked pin; main task only.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != OK {
        return Err(GpioError::Driver(ret).into());
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn write(pin: i32, high: bool) -> Result<()> {
    check(pin)?;
    // SAFETY: level write on a range-checked pin; main task only.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != OK {
        return Err(GpioError::Driver(ret).into());
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn read(pin: i32) -> bool {
    if check(pin).is_err() {
        return false;
    }
    // SAFETY: read-only register access.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Return a pin to its power-on state (input, no pulls).
#[cfg(target_os = "espidf")]
pub fn release(pin: i32) {
    if check(pin).is_ok() {
        // SAFETY: range-checked pin; main task only.
        unsafe {
            gpio_reset_pin(pin);
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::cell::Cell;

    use super::PinMode;

    pub(super) const PINS: usize = super::MAX_GPIO as usize + 1;

    #[derive(Clone, Copy)]
    pub(super) struct SimPin {
        pub mode: Option<PinMode>,
        pub level: bool,
        pub stuck_low: bool,
    }

    const IDLE: SimPin = SimPin {
        mode: None,
        level: false,
        stuck_low: false,
    };

    thread_local! {
        pub(super) static PINS_STATE: [Cell<SimPin>; PINS] = const { [const { Cell::new(IDLE) }; PINS] };
    }

    pub(super) fn with<R>(pin: i32, f: impl FnOnce(&Cell<SimPin>) -> R) -> R {
        PINS_STATE.with(|pins| f(&pins[pin as usize]))
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn configure(pin: i32, mode: PinMode) -> Result<()> {
    check(pin)?;
    sim::with(pin, |cell| {
        let mut p = cell.get();
        p.mode = Some(mode);
        cell.set(p);
    });
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn write(pin: i32, high: bool) -> Result<()> {
    check(pin)?;
    sim::with(pin, |cell| {
        let mut p = cell.get();
        p.level = high;
        cell.set(p);
    });
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn read(pin: i32) -> bool {
    if check(pin).is_err() {
        return false;
    }
    sim::with(pin, |cell| {
        let p = cell.get();
        if p.stuck_low {
            return false;
        }
        match p.mode {
            Some(PinMode::Output) => p.level,
            Some(PinMode::InputPullup) => true,
            Some(PinMode::Input) | None => false,
        }
    })
}

#[cfg(not(target_os = "espidf"))]
pub fn release(pin: i32) {
    if check(pin).is_ok() {
        sim::with(pin, |cell| {
            let mut p = cell.get();
            p.mode = None;
            p.level = false;
            cell.set(p);
        });
    }
}

/// Simulation only: force `pin` to read low regardless of mode.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_stuck_low(pin: i32, stuck: bool) {
    if check(pin).is_ok() {
        sim::with(pin, |cell| {
            let mut p = cell.get();
            p.stuck_low = stuck;
            cell.set(p);
        });
    }
}
