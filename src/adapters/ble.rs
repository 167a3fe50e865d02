//! BLE peer scanner.
//!
//! Runs a bounded active GAP scan and reports every distinct advertiser
//! once through a plain listener function.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GAP scan via raw
//!   `esp_idf_svc::sys` calls.  The stack is brought up on the first scan
//!   and kept alive afterwards.
//! - **all other targets**: three fixed simulated peers.
//!
//! ## Callback bridge
//!
//! Bluedroid callbacks are C function pointers that cannot capture Rust
//! closures.  The GAP handler pushes sightings into a static queue; the
//! main task drains it between settle slices and calls the listener.

use core::fmt::Write;

use log::info;
#[cfg(target_os = "espidf")]
use log::{error, warn};

use crate::app::ports::{ClockPort, NetError};

/// How often the sighting queue is drained during a scan window.
const DRAIN_INTERVAL_MS: u32 = 100;

/// Sightings beyond this many distinct peers per scan are dropped.
pub const MAX_PEERS: usize = 32;

// ───────────────────────────────────────────────────────────────
// Sighting
// ───────────────────────────────────────────────────────────────

/// One advertiser seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSighting {
    pub addr: [u8; 6],
    pub rssi: i8,
    /// Complete or shortened local name, if advertised.
    pub name: Option<heapless::String<32>>,
}

impl PeerSighting {
    /// `aa:bb:cc:dd:ee:ff`, the order Bluedroid prints addresses in.
    pub fn addr_string(&self) -> heapless::String<18> {
        let mut s = heapless::String::new();
        let a = &self.addr;
        let _ = write!(
            s,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        );
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Ready,
    Failed,
}

// ── ESP-IDF static bridge ─────────────────────────────────────

#[cfg(target_os = "espidf")]
const OK: esp_idf_svc::sys::esp_err_t = esp_idf_svc::sys::ESP_OK as esp_idf_svc::sys::esp_err_t;

// GAP callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static PENDING: std::sync::Mutex<heapless::Vec<PeerSighting, MAX_PEERS>> =
    std::sync::Mutex::new(heapless::Vec::new());
#[cfg(target_os = "espidf")]
static SEEN: std::sync::Mutex<heapless::Vec<[u8; 6], MAX_PEERS>> =
    std::sync::Mutex::new(heapless::Vec::new());

#[cfg(target_os = "espidf")]
fn record_sighting(sighting: PeerSighting) {
    let Ok(mut seen) = SEEN.lock() else { return };
    if seen.contains(&sighting.addr) || seen.push(sighting.addr).is_err() {
        return;
    }
    if let Ok(mut pending) = PENDING.lock() {
        let _ = pending.push(sighting);
    }
}

#[cfg(target_os = "espidf")]
fn take_pending() -> heapless::Vec<PeerSighting, MAX_PEERS> {
    PENDING
        .lock()
        .map(|mut pending| core::mem::take(&mut *pending))
        .unwrap_or_default()
}

#[cfg(target_os = "espidf")]
fn reset_bridge() {
    if let Ok(mut seen) = SEEN.lock() {
        seen.clear();
    }
    if let Ok(mut pending) = PENDING.lock() {
        pending.clear();
    }
}

/// Pull the advertised name out of a scan result's AD structures.
#[cfg(target_os = "espidf")]
unsafe fn advertised_name(adv: *mut u8) -> Option<heapless::String<32>> {
    use esp_idf_svc::sys::*;
    for ad_type in [
        esp_ble_adv_data_type_ESP_BLE_AD_TYPE_NAME_CMPL,
        esp_ble_adv_data_type_ESP_BLE_AD_TYPE_NAME_SHORT,
    ] {
        let mut len: u8 = 0;
        let ptr = unsafe { esp_ble_resolve_adv_data(adv, ad_type as u8, &mut len) };
        if !ptr.is_null() && len > 0 {
            let bytes = unsafe { core::slice::from_raw_parts(ptr, usize::from(len)) };
            let text = String::from_utf8_lossy(bytes);
            return Some(crate::config::heapless_str(&text));
        }
    }
    None
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_PARAM_SET_COMPLETE_EVT => {
            log::info!("BLE GAP: scan parameters set");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_START_COMPLETE_EVT => {
            let status = unsafe { (*param).scan_start_cmpl.status };
            if status != esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::warn!("BLE GAP: scan start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RESULT_EVT => {
            let p = unsafe { &mut (*param).scan_rst };
            if p.search_evt == esp_gap_search_evt_t_ESP_GAP_SEARCH_INQ_RES_EVT {
                let name = unsafe { advertised_name(p.ble_adv.as_mut_ptr()) };
                record_sighting(PeerSighting {
                    addr: p.bda,
                    rssi: p.rssi.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8,
                    name,
                });
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: scan stopped");
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Scanner
// ───────────────────────────────────────────────────────────────

pub struct BleScanner {
    state: BleState,
    /// Simulation: peers already reported in the current scan.
    #[cfg(not(target_os = "espidf"))]
    sim_reported: usize,
}

impl Default for BleScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BleScanner {
    pub fn new() -> Self {
        Self {
            state: BleState::Idle,
            #[cfg(not(target_os = "espidf"))]
            sim_reported: 0,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Scan for `window_secs`, invoking `listener` once per distinct peer
    /// as it is discovered.  Returns the number of peers reported.
    ///
    /// The window is spent in `clock.settle` slices, so a clock that feeds
    /// the watchdog keeps it fed for the whole scan.
    pub fn scan(
        &mut self,
        window_secs: u8,
        clock: &mut dyn ClockPort,
        listener: &mut dyn FnMut(&PeerSighting),
    ) -> Result<usize, NetError> {
        if self.state == BleState::Idle {
            self.platform_init();
        }
        if self.state == BleState::Failed {
            return Err(NetError::ScanFailed);
        }

        self.platform_start_scan(window_secs)?;
        info!("BLE: scanning for {}s", window_secs);

        let window_ms = u32::from(window_secs) * 1000;
        let mut waited = 0;
        let mut reported = 0;
        while waited < window_ms {
            let slice = DRAIN_INTERVAL_MS.min(window_ms - waited);
            clock.settle(slice);
            waited += slice;
            reported += self.drain(waited, listener);
        }

        self.platform_stop_scan();
        reported += self.drain(window_ms, listener);
        info!("BLE: scan complete, {} peers", reported);
        Ok(reported)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != OK {
                error!("BLE: bt_controller_init failed ({})", ret);
                self.state = BleState::Failed;
                return;
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != OK {
                error!("BLE: bt_controller_enable failed ({})", ret);
                self.state = BleState::Failed;
                return;
            }

            let ret = esp_bluedroid_init();
            if ret != OK {
                error!("BLE: bluedroid_init failed ({})", ret);
                self.state = BleState::Failed;
                return;
            }

            let ret = esp_bluedroid_enable();
            if ret != OK {
                error!("BLE: bluedroid_enable failed ({})", ret);
                self.state = BleState::Failed;
                return;
            }

            let ret = esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            if ret != OK {
                error!("BLE: gap_register_callback failed ({})", ret);
                self.state = BleState::Failed;
                return;
            }
        }
        info!("BLE(espidf): Bluedroid stack initialised for scanning");
        self.state = BleState::Ready;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) {
        info!("BLE(sim): scanner ready");
        self.state = BleState::Ready;
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_scan(&mut self, window_secs: u8) -> Result<(), NetError> {
        use esp_idf_svc::sys::*;
        reset_bridge();
        unsafe {
            let mut params = esp_ble_scan_params_t {
                scan_type: esp_ble_scan_type_t_BLE_SCAN_TYPE_ACTIVE,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                scan_filter_policy: esp_ble_scan_filter_t_BLE_SCAN_FILTER_ALLOW_ALL,
                scan_interval: 0x50,
                scan_window: 0x30,
                ..core::mem::zeroed()
            };
            let ret = esp_ble_gap_set_scan_params(&mut params);
            if ret != OK {
                warn!("BLE: set_scan_params failed ({})", ret);
                return Err(NetError::ScanFailed);
            }
            let ret = esp_ble_gap_start_scanning(u32::from(window_secs));
            if ret != OK {
                warn!("BLE: start_scanning failed ({})", ret);
                return Err(NetError::ScanFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_scan(&mut self, _window_secs: u8) -> Result<(), NetError> {
        self.sim_reported = 0;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop_scan(&mut self) {
        unsafe {
            esp_idf_svc::sys::esp_ble_gap_stop_scanning();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop_scan(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn drain(&mut self, _elapsed_ms: u32, listener: &mut dyn FnMut(&PeerSighting)) -> usize {
        let batch = take_pending();
        for sighting in &batch {
            listener(sighting);
        }
        batch.len()
    }

    /// Simulation: one peer becomes visible per second of the window.
    #[cfg(not(target_os = "espidf"))]
    fn drain(&mut self, elapsed_ms: u32, listener: &mut dyn FnMut(&PeerSighting)) -> usize {
        let visible = (elapsed_ms / 1000) as usize;
        let peers = sim_peers();
        let mut reported = 0;
        while self.sim_reported < visible.min(peers.len()) {
            listener(&peers[self.sim_reported]);
            self.sim_reported += 1;
            reported += 1;
        }
        reported
    }
}

#[cfg(not(target_os = "espidf"))]
fn sim_peers() -> [PeerSighting; 3] {
    [
        PeerSighting {
            addr: [0xc4, 0x7c, 0x8d, 0x6a, 0x11, 0x02],
            rssi: -54,
            name: Some(crate::config::heapless_str("Flower care")),
        },
        PeerSighting {
            addr: [0xe2, 0x15, 0x3a, 0x90, 0x4b, 0x7f],
            rssi: -71,
            name: None,
        },
        PeerSighting {
            addr: [0x28, 0xcd, 0xc1, 0x03, 0x9e, 0x51],
            rssi: -83,
            name: Some(crate::config::heapless_str("HR-Strap")),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StepClock {
        now_us: u64,
    }

    impl ClockPort for StepClock {
        fn uptime_us(&self) -> u64 {
            self.now_us
        }
        fn settle(&mut self, ms: u32) {
            self.now_us += u64::from(ms) * 1000;
        }
    }

    #[test]
    fn addr_string_is_lowercase_colon_hex() {
        let s = PeerSighting {
            addr: [0xAA, 0x01, 0x02, 0x03, 0x04, 0xFF],
            rssi: -40,
            name: None,
        };
        assert_eq!(s.addr_string().as_str(), "aa:01:02:03:04:ff");
    }

    #[test]
    fn sim_scan_reports_each_peer_once() {
        let mut scanner = BleScanner::new();
        let mut clock = StepClock { now_us: 0 };
        let mut seen = Vec::new();
        let n = scanner
            .scan(5, &mut clock, &mut |p| seen.push(p.addr))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(clock.uptime_ms(), 5000);
        assert_eq!(scanner.state(), BleState::Ready);
    }

    #[test]
    fn short_window_sees_fewer_peers() {
        let mut scanner = BleScanner::new();
        let mut clock = StepClock { now_us: 0 };
        let n = scanner.scan(1, &mut clock, &mut |_| {}).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn zero_window_reports_nothing() {
        let mut scanner = BleScanner::new();
        let mut clock = StepClock { now_us: 0 };
        assert_eq!(scanner.scan(0, &mut clock, &mut |_| {}).unwrap(), 0);
    }
}
