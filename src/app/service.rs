//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the session and dispatches operator commands.  All
//! I/O flows through the [`Ports`] bundle passed in at each call, so the
//! whole service runs against mock adapters in tests.
//!
//! ```text
//!  ConsolePort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService           │
//!   ProbePort ◀────│ Orchestrator · Persistence    │────▶ StoragePort
//!                  │ FileService                   │────▶ FileStorePort
//!                  └──────────────────────────────┘ ◀──▶ FileServerPort
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::web::codec::Request;
use crate::web::routes::FileService;

use super::commands::{Command, MENU};
use super::events::AppEvent;
use super::orchestrator::DiagnosticOrchestrator;
use super::persistence::{ExportOutcome, PersistenceLayer};
use super::ports::Ports;
use super::session::Session;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: SystemConfig,
    session: Session,
    orchestrator: DiagnosticOrchestrator,
    persistence: PersistenceLayer,
    routes: FileService,
}

impl AppService {
    /// Allocate the session from configuration.
    ///
    /// Does **not** touch any port; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        let session = Session::new(config.capture_capacity as usize);
        let orchestrator = DiagnosticOrchestrator::new(config.probe_settle_ms);
        let persistence = PersistenceLayer::new(config.snapshot_capacity as usize);
        Self {
            config,
            session,
            orchestrator,
            persistence,
            routes: FileService::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn persistence(&self) -> &PersistenceLayer {
        &self.persistence
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the previous session's backup, if any, and show the menu.
    pub fn start(&mut self, ports: &mut Ports<'_>) {
        ports.sink.emit(&AppEvent::Started {
            capture_capacity: self.session.capture().capacity(),
            snapshot_capacity: self.persistence.snapshot_capacity(),
        });

        match self.persistence.read_snapshot(&*ports.kv) {
            Ok(backup) if !backup.is_empty() => {
                info!("boot: previous session backup found ({} bytes)", backup.len());
                ports.sink.emit(&AppEvent::BackupFound {
                    bytes: backup.len(),
                });
                ports.console.write_str(&format!(
                    "\nPrevious session backup in NVS: {} bytes\n",
                    backup.len()
                ));
            }
            Ok(_) => info!("boot: NVS backup slot is empty"),
            Err(e) => info!("boot: no NVS backup ({})", e),
        }

        if !ports.files.is_ready() {
            ports
                .console
                .write_str("\n[WARNING] file store not mounted: exports fall back to NVS + console\n");
        }

        ports.console.write_str(MENU);
    }

    // ── Run loop ──────────────────────────────────────────────

    /// One run-loop iteration: read at most one input line and dispatch
    /// it, then serve at most one HTTP connection.
    ///
    /// Returns `true` if anything was done.
    pub fn poll(&mut self, ports: &mut Ports<'_>) -> bool {
        let mut busy = false;
        if let Some(line) = ports.console.poll_line() {
            busy |= self.handle_line(&line, ports);
        }
        busy |= self.serve_files(ports);
        busy
    }

    /// Parse and dispatch one input line.  Blank lines are ignored.
    pub fn handle_line(&mut self, line: &str, ports: &mut Ports<'_>) -> bool {
        let Some(cmd) = Command::parse(line) else {
            return false;
        };
        ports.console.write_str(&format!("> {}\n", line.trim()));
        self.handle_command(cmd, ports);
        true
    }

    pub fn handle_command(&mut self, cmd: Command, ports: &mut Ports<'_>) {
        if !matches!(cmd, Command::Unknown(_)) {
            ports.sink.emit(&AppEvent::CommandAccepted(cmd.name()));
        }

        match cmd {
            Command::Probe(probe) => {
                self.orchestrator.run_single(&mut self.session, probe, ports);
            }

            Command::FullRun => {
                self.orchestrator.run_full(&mut self.session, ports);
                ports.console.write_str(&format!(
                    "\nFull diagnostic complete: {} bytes captured. Press X to export.\n",
                    self.session.capture().len()
                ));
            }

            Command::Export => self.export(ports),

            Command::ListFiles => {
                let listing = self.persistence.render_listing(&*ports.files);
                ports.console.write_str(&listing);
            }

            Command::StartFileService => self.start_file_service(ports),

            Command::ClearHistory => {
                self.session.capture_mut().clear();
                self.session.diagnostics_complete = false;
                ports.sink.emit(&AppEvent::CaptureCleared);
                ports.console.write_str("\nCapture buffer cleared.\n");
            }

            Command::Help => ports.console.write_str(MENU),

            Command::Reset => {
                ports.sink.emit(&AppEvent::PowerRequested { sleep: false });
                ports.console.write_str(&format!(
                    "\nRestarting in {} ms...\n",
                    self.config.restart_delay_ms
                ));
                ports.clock.settle(self.config.restart_delay_ms);
                ports.system.restart();
            }

            Command::Sleep => {
                ports.sink.emit(&AppEvent::PowerRequested { sleep: true });
                ports.console.write_str(
                    "\nEntering deep sleep. Press the reset button to wake.\n",
                );
                ports.clock.settle(self.config.sleep_delay_ms);
                ports.system.deep_sleep();
            }

            Command::Unknown(token) => {
                ports.console.write_str(&format!(
                    "Unknown command '{token}'. Type 'help' for the menu.\n"
                ));
                ports.sink.emit(&AppEvent::UnknownCommand(token));
            }
        }
    }

    // ── Commands with more than one outcome ───────────────────

    fn export(&mut self, ports: &mut Ports<'_>) {
        let elapsed_ms = ports.clock.uptime_ms();
        let outcome = self.persistence.export(
            self.session.capture(),
            elapsed_ms,
            &mut *ports.files,
            &mut *ports.kv,
            &mut *ports.console,
            &mut *ports.sink,
        );

        match outcome {
            ExportOutcome::Written {
                path,
                bytes,
                snapshot_saved,
            } => {
                ports.console.write_str(&format!(
                    "\nExport saved: {path} ({bytes} bytes)\nNVS backup: {}\n",
                    if snapshot_saved { "saved" } else { "FAILED" }
                ));
                if let Some(addr) = self.session.file_service_addr() {
                    ports
                        .console
                        .write_str(&format!("Download: http://{addr}/\n"));
                } else {
                    ports
                        .console
                        .write_str("Start the file service (W) to download it.\n");
                }
            }
            ExportOutcome::NothingToExport => {
                ports
                    .console
                    .write_str("\nNothing to export: run a diagnostic first.\n");
            }
            // The persistence layer already dumped the capture to the console.
            ExportOutcome::FellBack { .. } => {}
        }
    }

    fn start_file_service(&mut self, ports: &mut Ports<'_>) {
        if let Some(addr) = self.session.file_service_addr() {
            ports.console.write_str(&format!(
                "\nFile service already running: http://{addr}/\n"
            ));
            return;
        }

        let ssid = self.config.ap_ssid.as_str();
        let password = self.config.ap_password.as_str();
        match ports.server.start(ssid, password, self.config.http_port) {
            Ok(addr) => {
                self.session.file_service = Some(addr);
                ports.sink.emit(&AppEvent::FileServiceStarted(addr));
                ports.console.write_str(&format!(
                    "\nFile service started\n  SSID:     {ssid}\n  Password: {password}\n  Open:     http://{addr}/\n"
                ));
            }
            Err(e) => {
                warn!("file service: {}", e);
                ports.sink.emit(&AppEvent::FileServiceFailed(e));
                ports
                    .console
                    .write_str(&format!("\n[ERROR] file service failed to start: {e}\n"));
            }
        }
    }

    fn serve_files(&mut self, ports: &mut Ports<'_>) -> bool {
        if !self.session.file_service_active() || !ports.server.is_running() {
            return false;
        }

        let routes = &self.routes;
        let files = &mut *ports.files;
        let sink = &mut *ports.sink;
        ports.server.poll(&mut |req: &Request| {
            let resp = routes.handle(req, files);
            sink.emit(&AppEvent::HttpServed {
                method: req.method.as_str().to_string(),
                path: req.path.clone(),
                status: resp.status,
            });
            resp
        })
    }
}
