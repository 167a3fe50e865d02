//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the main loop
//! stalls for longer than the configured timeout.
//!
//! The main loop must call `feed()` on every iteration.  Long probes block
//! inside `ClockPort::settle`, so [`WatchdogClock`] feeds between settle
//! slices and a multi-second scan never trips the timer.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::cell::Cell;

use log::info;

use crate::app::ports::ClockPort;

/// Longest single block inside [`WatchdogClock::settle`].
pub const FEED_SLICE_MS: u32 = 1000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    timeout_ms: u32,
    feeds: Cell<u32>,
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK as esp_err_t {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK as esp_err_t;
                if subscribed {
                    info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    subscribed,
                    timeout_ms,
                    feeds: Cell::new(0),
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}ms timeout, no-op", timeout_ms);
            Self {
                timeout_ms,
                feeds: Cell::new(0),
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feeds since boot.
    pub fn feeds(&self) -> u32 {
        self.feeds.get()
    }

    /// Feed the watchdog. Must be called at least once per timeout period.
    pub fn feed(&self) {
        self.feeds.set(self.feeds.get().wrapping_add(1));
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}

/// A [`ClockPort`] that feeds the watchdog while it waits.
pub struct WatchdogClock<C> {
    inner: C,
    watchdog: Watchdog,
}

impl<C: ClockPort> WatchdogClock<C> {
    pub fn new(inner: C, watchdog: Watchdog) -> Self {
        Self { inner, watchdog }
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}

impl<C: ClockPort> ClockPort for WatchdogClock<C> {
    fn uptime_us(&self) -> u64 {
        self.inner.uptime_us()
    }

    fn settle(&mut self, ms: u32) {
        let mut left = ms;
        loop {
            self.watchdog.feed();
            if left == 0 {
                break;
            }
            let slice = left.min(FEED_SLICE_MS);
            self.inner.settle(slice);
            left -= slice;
        }
    }
}
