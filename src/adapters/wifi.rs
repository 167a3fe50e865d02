//! WiFi radio adapter.
//!
//! One radio serves two masters: the station scan used by the wifi probe
//! and the SoftAP that carries the file service.  The adapter is shared
//! through `Rc<RefCell<WifiRadio>>` between [`HardwareProbes`] and
//! [`SoftApFileServer`]; both run on the main loop so the borrow is never
//! contended.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over
//!   `EspWifi`.  Scans run in STA mode; once the access point is up the
//!   radio stays in mixed (AP+STA) mode so scans keep working.
//! - **all other targets**: a deterministic list of networks and a
//!   loopback "access point".
//!
//! [`HardwareProbes`]: crate::probes::HardwareProbes
//! [`SoftApFileServer`]: super::file_server::SoftApFileServer

use std::net::Ipv4Addr;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::NetError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};

/// Channel used for the diagnostic access point.
const AP_CHANNEL: u8 = 1;
const AP_MAX_CLIENTS: u16 = 4;

/// How long `start_ap` waits for the AP interface to come up.
#[cfg(target_os = "espidf")]
const AP_UP_POLLS: u32 = 50;
#[cfg(target_os = "espidf")]
const AP_UP_POLL_MS: u32 = 100;

// ───────────────────────────────────────────────────────────────
// Scan results
// ───────────────────────────────────────────────────────────────

/// Security of a scanned network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
    Other,
}

impl AuthKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Wep => "WEP",
            Self::WpaPsk => "WPA",
            Self::Wpa2Psk => "WPA2",
            Self::WpaWpa2Psk => "WPA/WPA2",
            Self::Wpa2Enterprise => "WPA2-ENT",
            Self::Wpa3Psk => "WPA3",
            Self::Wpa2Wpa3Psk => "WPA2/WPA3",
            Self::Other => "OTHER",
        }
    }
}

#[cfg(target_os = "espidf")]
impl From<Option<AuthMethod>> for AuthKind {
    fn from(method: Option<AuthMethod>) -> Self {
        match method {
            None | Some(AuthMethod::None) => Self::Open,
            Some(AuthMethod::WEP) => Self::Wep,
            Some(AuthMethod::WPA) => Self::WpaPsk,
            Some(AuthMethod::WPA2Personal) => Self::Wpa2Psk,
            Some(AuthMethod::WPAWPA2Personal) => Self::WpaWpa2Psk,
            Some(AuthMethod::WPA2Enterprise) => Self::Wpa2Enterprise,
            Some(AuthMethod::WPA3Personal) => Self::Wpa3Psk,
            Some(AuthMethod::WPA2WPA3Personal) => Self::Wpa2Wpa3Psk,
            Some(_) => Self::Other,
        }
    }
}

/// One access point seen by a station scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNetwork {
    pub ssid: heapless::String<32>,
    pub rssi: i8,
    pub channel: u8,
    pub auth: AuthKind,
}

// ───────────────────────────────────────────────────────────────
// Radio
// ───────────────────────────────────────────────────────────────

pub struct WifiRadio {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    ap_ip: Option<Ipv4Addr>,
    scans: u32,
}

impl WifiRadio {
    #[cfg(target_os = "espidf")]
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> crate::error::Result<Self> {
        let driver = EspWifi::new(modem, sysloop.clone(), None)
            .map_err(|_| crate::error::Error::Init("wifi driver"))?;
        let wifi = BlockingWifi::wrap(driver, sysloop)
            .map_err(|_| crate::error::Error::Init("wifi event loop"))?;
        info!("WiFi: driver ready");
        Ok(Self {
            wifi,
            ap_ip: None,
            scans: 0,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("WiFi(sim): simulated radio");
        Self {
            ap_ip: None,
            scans: 0,
        }
    }

    /// Address of the access point, once started.
    pub fn ap_ip(&self) -> Option<Ipv4Addr> {
        self.ap_ip
    }

    /// Number of scans completed since boot.
    pub fn scans(&self) -> u32 {
        self.scans
    }

    /// Blocking station scan.  Results are ordered strongest first.
    pub fn scan(&mut self) -> Result<Vec<ScannedNetwork>, NetError> {
        let mut networks = self.platform_scan()?;
        networks.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        self.scans = self.scans.wrapping_add(1);
        info!("WiFi: scan #{} found {} networks", self.scans, networks.len());
        Ok(networks)
    }

    /// Bring up the WPA2 access point.  Idempotent.
    pub fn start_ap(&mut self, ssid: &str, password: &str) -> Result<Ipv4Addr, NetError> {
        if let Some(ip) = self.ap_ip {
            return Ok(ip);
        }
        let ip = self.platform_start_ap(ssid, password)?;
        info!("WiFi: access point '{}' up at {}", ssid, ip);
        self.ap_ip = Some(ip);
        Ok(ip)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_scan(&mut self) -> Result<Vec<ScannedNetwork>, NetError> {
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration::default()))
                .map_err(|e| {
                    warn!("WiFi: STA configuration rejected ({})", e);
                    NetError::ScanFailed
                })?;
            self.wifi.start().map_err(|e| {
                warn!("WiFi: start failed ({})", e);
                NetError::ScanFailed
            })?;
        }

        let found = self.wifi.scan().map_err(|e| {
            warn!("WiFi: scan failed ({})", e);
            NetError::ScanFailed
        })?;

        Ok(found
            .into_iter()
            .map(|ap| ScannedNetwork {
                ssid: crate::config::heapless_str(ap.ssid.as_str()),
                rssi: ap.signal_strength,
                channel: ap.channel,
                auth: AuthKind::from(ap.auth_method),
            })
            .collect())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_scan(&mut self) -> Result<Vec<ScannedNetwork>, NetError> {
        const SIM_NETWORKS: [(&str, i8, u8, AuthKind); 10] = [
            ("HomeNet", -42, 6, AuthKind::Wpa2Psk),
            ("Office-5G", -67, 11, AuthKind::Wpa2Wpa3Psk),
            ("CoffeeShop", -71, 1, AuthKind::Open),
            ("Printer-DIRECT", -58, 6, AuthKind::Wpa2Psk),
            ("Neighbour", -80, 3, AuthKind::WpaWpa2Psk),
            ("IoT-Bridge", -28, 9, AuthKind::Wpa2Psk),
            ("Guest", -63, 1, AuthKind::Open),
            ("Lab-Ent", -55, 13, AuthKind::Wpa2Enterprise),
            ("OldRouter", -88, 4, AuthKind::Wep),
            ("Mesh-Node", -49, 11, AuthKind::Wpa3Psk),
        ];
        Ok(SIM_NETWORKS
            .iter()
            .map(|&(ssid, rssi, channel, auth)| ScannedNetwork {
                ssid: crate::config::heapless_str(ssid),
                rssi,
                channel,
                auth,
            })
            .collect())
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(&mut self, ssid: &str, password: &str) -> Result<Ipv4Addr, NetError> {
        let ap = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| NetError::InvalidCredentials)?,
            password: password
                .try_into()
                .map_err(|_| NetError::InvalidCredentials)?,
            auth_method: AuthMethod::WPA2Personal,
            channel: AP_CHANNEL,
            max_connections: AP_MAX_CLIENTS,
            ..Default::default()
        };

        if self.wifi.is_started().unwrap_or(false) {
            let _ = self.wifi.stop();
        }
        self.wifi
            .set_configuration(&Configuration::Mixed(ClientConfiguration::default(), ap))
            .map_err(|e| {
                warn!("WiFi: AP configuration rejected ({})", e);
                NetError::ApStartFailed
            })?;
        self.wifi.start().map_err(|e| {
            warn!("WiFi: AP start failed ({})", e);
            NetError::ApStartFailed
        })?;

        // Mixed mode never reports "up" without a station link, so only the
        // AP interface is waited on.
        for _ in 0..AP_UP_POLLS {
            if self.wifi.wifi().ap_netif().is_up().unwrap_or(false) {
                break;
            }
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(AP_UP_POLL_MS);
        }

        let info = self.wifi.wifi().ap_netif().get_ip_info().map_err(|e| {
            warn!("WiFi: AP has no address ({})", e);
            NetError::ApStartFailed
        })?;
        Ok(info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(&mut self, ssid: &str, _password: &str) -> Result<Ipv4Addr, NetError> {
        info!(
            "WiFi(sim): AP '{}' on channel {} (max {} clients)",
            ssid, AP_CHANNEL, AP_MAX_CLIENTS
        );
        Ok(Ipv4Addr::LOCALHOST)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiRadio {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
