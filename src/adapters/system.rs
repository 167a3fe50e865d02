//! Device power control.
//!
//! Implements [`SystemPort`].  On hardware `restart` and `deep_sleep` never
//! return; the simulation logs and exits the process (restart) or parks
//! the thread (sleep) so a host run behaves like the board would.

use log::info;

use crate::app::ports::SystemPort;

#[derive(Debug, Default)]
pub struct EspSystem;

impl EspSystem {
    pub fn new() -> Self {
        Self
    }
}

impl SystemPort for EspSystem {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("System: esp_restart()");
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("System(sim): restart requested, exiting");
        std::process::exit(0);
    }

    /// Deep sleep with every wake-up source disabled: only the reset line
    /// brings the chip back.
    #[cfg(target_os = "espidf")]
    fn deep_sleep(&mut self) {
        use esp_idf_svc::sys::*;
        info!("System: entering deep sleep (no wake source)");
        unsafe {
            esp_sleep_disable_wakeup_source(esp_sleep_source_t_ESP_SLEEP_WAKEUP_ALL);
            esp_deep_sleep_start();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep(&mut self) {
        info!("System(sim): deep sleep, parking until the process is killed");
        loop {
            std::thread::park();
        }
    }
}
