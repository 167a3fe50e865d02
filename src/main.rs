//! ChipScope firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SerialConsole   WatchdogClock   HardwareProbes   NvsAdapter   │
//! │  (ConsolePort)   (ClockPort)     (ProbePort)      (KV+Config)  │
//! │  FlashFileStore  SoftApFileServer EspSystem       LogEventSink │
//! │  (FileStore)     (FileServer)     (SystemPort)    (EventSink)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Dispatcher · Orchestrator · Persistence · FileService │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One task, one loop: read a console line, serve one HTTP connection,
//! feed the watchdog, sleep `loop_interval_ms`.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{info, warn};

use chipscope::adapters::console::SerialConsole;
use chipscope::adapters::device_id;
use chipscope::adapters::file_server::SoftApFileServer;
use chipscope::adapters::flash_fs::FlashFileStore;
use chipscope::adapters::log_sink::LogEventSink;
use chipscope::adapters::nvs::NvsAdapter;
use chipscope::adapters::system::EspSystem;
use chipscope::adapters::time::Esp32TimeAdapter;
use chipscope::adapters::wifi::WifiRadio;
use chipscope::app::ports::{ClockPort, ConfigPort, Ports};
use chipscope::app::service::AppService;
use chipscope::config::SystemConfig;
use chipscope::drivers::watchdog::{Watchdog, WatchdogClock};
use chipscope::probes::HardwareProbes;

/// Every adapter the service is wired to, owned in one place so a fresh
/// [`Ports`] bundle can be borrowed each loop iteration.
struct Firmware {
    console: SerialConsole,
    clock: WatchdogClock<Esp32TimeAdapter>,
    probes: HardwareProbes,
    nvs: NvsAdapter,
    files: FlashFileStore,
    server: SoftApFileServer,
    system: EspSystem,
    sink: LogEventSink,
}

impl Firmware {
    fn ports(&mut self) -> Ports<'_> {
        Ports {
            console: &mut self.console,
            clock: &mut self.clock,
            probes: &mut self.probes,
            kv: &mut self.nvs,
            files: &mut self.files,
            server: &mut self.server,
            system: &mut self.system,
            sink: &mut self.sink,
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ChipScope v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let mac = device_id::read_mac();
    info!("Device ID: {} (MAC {})", device_id::device_id(&mac), device_id::format_mac(&mac));

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running without durable snapshot", e);
            NvsAdapter::detached()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Radio (shared by the wifi probe and the SoftAP) ───
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let radio = Rc::new(RefCell::new(WifiRadio::new(peripherals.modem, sysloop)?));

    // ── 4. File store ─────────────────────────────────────────
    let files = match FlashFileStore::mount(config.fs_base_path.as_str(), config.fs_capacity_bytes) {
        Ok(fs) => fs,
        Err(e) => {
            warn!("File store mount failed ({}), exports fall back to NVS", e);
            FlashFileStore::unmounted()
        }
    };

    // ── 5. Construct adapters ─────────────────────────────────
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    let mut fw = Firmware {
        console: SerialConsole::new(),
        clock: WatchdogClock::new(Esp32TimeAdapter::new(), watchdog),
        probes: HardwareProbes::new(Rc::clone(&radio), &config),
        nvs,
        files,
        server: SoftApFileServer::new(radio),
        system: EspSystem::new(),
        sink: LogEventSink::new(),
    };

    // ── 6. Construct app service ──────────────────────────────
    let loop_interval_ms = config.loop_interval_ms;
    let mut app = AppService::new(config);
    app.start(&mut fw.ports());

    info!("System ready. Entering run loop.");

    // ── 7. Run loop ───────────────────────────────────────────
    loop {
        app.poll(&mut fw.ports());
        fw.clock.watchdog().feed();
        fw.clock.settle(loop_interval_ms);
    }
}
