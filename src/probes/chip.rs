//! Chip identity probe.

use core::fmt::Write;

use super::{footer, heading, yes_no};
use crate::adapters::device_id::{self, MacAddress};
use crate::app::ports::ProbeId;

/// SPI flash read mode the boot flash runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    Qio,
    Qout,
    Dio,
    Dout,
    Unknown,
}

impl FlashMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Qio => "QIO",
            Self::Qout => "QOUT",
            Self::Dio => "DIO",
            Self::Dout => "DOUT",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipReading {
    pub model: &'static str,
    /// Full revision, `major * 100 + minor`.
    pub revision: u16,
    pub cores: u8,
    pub wifi: bool,
    pub ble: bool,
    pub mac: MacAddress,
    pub flash_bytes: u32,
    pub flash_mode: FlashMode,
    /// Configured flash clock, as esptool spells it (`80m`).
    pub flash_freq: String,
    /// Size of the partition the running app was booted from.
    pub app_slot_bytes: u32,
    pub idf_version: String,
}

#[cfg(target_os = "espidf")]
pub fn read() -> ChipReading {
    use esp_idf_svc::sys::*;

    let mut info: esp_chip_info_t = unsafe { core::mem::zeroed() };
    // SAFETY: out-pointer to a local.
    unsafe { esp_chip_info(&mut info) };

    #[allow(non_upper_case_globals)]
    let model = match info.model {
        esp_chip_model_t_CHIP_ESP32 => "ESP32",
        esp_chip_model_t_CHIP_ESP32S2 => "ESP32-S2",
        esp_chip_model_t_CHIP_ESP32S3 => "ESP32-S3",
        esp_chip_model_t_CHIP_ESP32C3 => "ESP32-C3",
        esp_chip_model_t_CHIP_ESP32C6 => "ESP32-C6",
        esp_chip_model_t_CHIP_ESP32H2 => "ESP32-H2",
        _ => "unknown",
    };

    let mut flash_bytes: u32 = 0;
    // SAFETY: a null chip pointer selects the default (boot) flash chip.
    let ret = unsafe { esp_flash_get_size(core::ptr::null_mut(), &mut flash_bytes) };
    if ret != ESP_OK as esp_err_t {
        log::warn!("chip: esp_flash_get_size failed ({})", ret);
        flash_bytes = 0;
    }

    // SAFETY: set by the flash init code before app_main and never freed.
    let chip = unsafe { esp_flash_default_chip };
    #[allow(non_upper_case_globals)]
    let flash_mode = if chip.is_null() {
        FlashMode::Unknown
    } else {
        match unsafe { (*chip).read_mode } {
            esp_flash_io_mode_t_SPI_FLASH_QIO => FlashMode::Qio,
            esp_flash_io_mode_t_SPI_FLASH_QOUT => FlashMode::Qout,
            esp_flash_io_mode_t_SPI_FLASH_DIO => FlashMode::Dio,
            esp_flash_io_mode_t_SPI_FLASH_DOUT => FlashMode::Dout,
            _ => FlashMode::Unknown,
        }
    };

    let flash_freq = core::ffi::CStr::from_bytes_until_nul(CONFIG_ESPTOOLPY_FLASHFREQ)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // SAFETY: the running partition descriptor lives in the static table.
    let running = unsafe { esp_ota_get_running_partition() };
    let app_slot_bytes = if running.is_null() {
        0
    } else {
        unsafe { (*running).size }
    };

    // SAFETY: returns a pointer to a static NUL-terminated string.
    let idf_version = unsafe { core::ffi::CStr::from_ptr(esp_get_idf_version()) }
        .to_string_lossy()
        .into_owned();

    ChipReading {
        model,
        revision: info.revision,
        cores: info.cores,
        wifi: info.features & CHIP_FEATURE_WIFI_BGN != 0,
        ble: info.features & CHIP_FEATURE_BLE != 0,
        mac: device_id::read_mac(),
        flash_bytes,
        flash_mode,
        flash_freq,
        app_slot_bytes,
        idf_version,
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn read() -> ChipReading {
    ChipReading {
        model: "ESP32-C3 (sim)",
        revision: 4,
        cores: 1,
        wifi: true,
        ble: true,
        mac: device_id::read_mac(),
        flash_bytes: 4 * 1024 * 1024,
        flash_mode: FlashMode::Dio,
        flash_freq: "80m".into(),
        app_slot_bytes: 1536 * 1024,
        idf_version: "v5.2-sim".into(),
    }
}

pub fn report(r: &ChipReading) -> String {
    let mut out = heading(ProbeId::Chip);
    let _ = writeln!(out, "Identification:");
    let _ = writeln!(out, "  Model:        {}", r.model);
    let _ = writeln!(out, "  Revision:     v{}.{}", r.revision / 100, r.revision % 100);
    let _ = writeln!(out, "  Cores:        {}", r.cores);
    let _ = writeln!(out, "  WiFi:         {}", yes_no(r.wifi));
    let _ = writeln!(out, "  Bluetooth LE: {}", yes_no(r.ble));
    let _ = writeln!(out, "  Chip ID:      {:06X}", device_id::chip_id(&r.mac));
    let _ = writeln!(out, "  Device ID:    {}", device_id::device_id(&r.mac));
    let _ = writeln!(out, "  MAC:          {}", device_id::format_mac(&r.mac));
    let _ = writeln!(out, "Flash:");
    let _ = writeln!(out, "  Size:         {} MB", r.flash_bytes / (1024 * 1024));
    let _ = writeln!(out, "  Speed:        {}", flash_speed(&r.flash_freq));
    let _ = writeln!(out, "  Mode:         {}", r.flash_mode.label());
    let _ = writeln!(out, "  App slot:     {} KB", r.app_slot_bytes / 1024);
    let _ = writeln!(out, "Firmware:");
    let _ = writeln!(out, "  chipscope:    v{}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "  ESP-IDF:      {}", r.idf_version);
    out.push_str(&footer(ProbeId::Chip));
    out
}

/// `80m` -> `80 MHz`; anything else is shown as configured.
fn flash_speed(freq: &str) -> String {
    match freq.strip_suffix('m') {
        Some(mhz) if !mhz.is_empty() && mhz.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{mhz} MHz")
        }
        _ if freq.is_empty() => "unknown".into(),
        _ => freq.to_string(),
    }
}
