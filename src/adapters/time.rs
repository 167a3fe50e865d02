//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] and `embedded_hal::delay::DelayNs`.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic) and
//!   blocks with `FreeRtos::delay_ms`, which yields to other tasks.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   `std::thread::sleep` for host-side runs.

use embedded_hal::delay::DelayNs;

use crate::app::ports::ClockPort;

/// Time adapter for the ESP32-C3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }

    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn block_ms(ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn block_ms(ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

impl ClockPort for Esp32TimeAdapter {
    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    fn uptime_us(&self) -> u64 {
        self.now_us()
    }

    fn settle(&mut self, ms: u32) {
        Self::block_ms(ms);
    }
}

impl DelayNs for Esp32TimeAdapter {
    fn delay_ns(&mut self, ns: u32) {
        // Sub-millisecond waits spin on the timer; longer ones block.
        if ns >= 1_000_000 {
            Self::block_ms(ns / 1_000_000);
            return;
        }
        let until = self.now_us() + u64::from(ns.div_ceil(1000));
        while self.now_us() < until {
            core::hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        Self::block_ms(ms);
    }
}
