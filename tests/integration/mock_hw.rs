//! Mock adapters for integration tests.
//!
//! Every port the service touches has an in-memory double here that
//! records what happened, so tests can assert on console output, saved
//! files, NVS contents and emitted events without real hardware.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};

use chipscope::app::events::AppEvent;
use chipscope::app::ports::{
    ClockPort, ConsolePort, EventSink, FileEntry, FileServerPort, FileStorePort, FsError,
    FsUsage, NetError, Ports, ProbeId, ProbePort, StorageError, StoragePort, SystemPort,
};
use chipscope::app::service::AppService;
use chipscope::config::SystemConfig;
use chipscope::web::codec::{Request, Response, parse_head};

// ── Console ───────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedConsole {
    pub input: VecDeque<String>,
    pub output: String,
}

#[allow(dead_code)]
impl ScriptedConsole {
    pub fn type_line(&mut self, line: &str) {
        self.input.push_back(line.to_string());
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl ConsolePort for ScriptedConsole {
    fn poll_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn write_str(&mut self, text: &str) {
        self.output.push_str(text);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Time only moves when someone settles (or a test advances it).
#[derive(Default)]
pub struct ManualClock {
    pub now_us: u64,
    pub settles: Vec<u32>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn advance_ms(&mut self, ms: u64) {
        self.now_us += ms * 1000;
    }
}

impl ClockPort for ManualClock {
    fn uptime_us(&self) -> u64 {
        self.now_us
    }

    fn settle(&mut self, ms: u32) {
        self.settles.push(ms);
        self.now_us += u64::from(ms) * 1000;
    }
}

// ── Probes ────────────────────────────────────────────────────

/// Returns `"<tag> report\n"` (or a configured override) for each probe
/// and records the call order.
#[derive(Default)]
pub struct ScriptedProbes {
    pub calls: Vec<ProbeId>,
    pub overrides: HashMap<ProbeId, String>,
    /// Simulated run time of each probe.
    pub cost_ms: u32,
}

#[allow(dead_code)]
impl ScriptedProbes {
    pub fn report_for(probe: ProbeId) -> String {
        format!("{} report\n", probe.tag())
    }

    pub fn with_report(mut self, probe: ProbeId, text: impl Into<String>) -> Self {
        self.overrides.insert(probe, text.into());
        self
    }
}

impl ProbePort for ScriptedProbes {
    fn run(&mut self, probe: ProbeId, clock: &mut dyn ClockPort) -> String {
        self.calls.push(probe);
        if self.cost_ms > 0 {
            clock.settle(self.cost_ms);
        }
        self.overrides
            .get(&probe)
            .cloned()
            .unwrap_or_else(|| Self::report_for(probe))
    }
}

// ── NVS ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemKv {
    pub data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: u32,
}

#[allow(dead_code)]
impl MemKv {
    pub fn get(&self, namespace: &str, key: &str) -> Option<&Vec<u8>> {
        self.data.get(&format!("{namespace}::{key}"))
    }

    pub fn put(&mut self, namespace: &str, key: &str, value: &[u8]) {
        self.data.insert(format!("{namespace}::{key}"), value.to_vec());
    }
}

impl StoragePort for MemKv {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let value = self.get(namespace, key).ok_or(StorageError::NotFound)?;
        let n = value.len().min(buf.len());
        buf[..n].copy_from_slice(&value[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.put(namespace, key, data);
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.get(namespace, key).is_some()
    }
}

// ── File store ────────────────────────────────────────────────

pub struct MemFiles {
    pub files: BTreeMap<String, Vec<u8>>,
    pub mounted: bool,
    pub total: u64,
    pub fail_delete: bool,
    pub creates: Cell<u32>,
}

impl Default for MemFiles {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            mounted: true,
            total: 1024 * 1024,
            fail_delete: false,
            creates: Cell::new(0),
        }
    }
}

#[allow(dead_code)]
impl MemFiles {
    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, name: &str, bytes: &[u8]) {
        self.files.insert(name.to_string(), bytes.to_vec());
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.files
            .get(name)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    fn used(&self) -> u64 {
        self.files.values().map(|v| v.len() as u64).sum()
    }

    fn check(&self) -> Result<(), FsError> {
        if self.mounted { Ok(()) } else { Err(FsError::NotMounted) }
    }
}

impl FileStorePort for MemFiles {
    fn is_ready(&self) -> bool {
        self.mounted
    }

    fn create(&mut self, path: &str, parts: &[&[u8]]) -> Result<u64, FsError> {
        self.check()?;
        if self.files.contains_key(path) {
            return Err(FsError::AlreadyExists);
        }
        let bytes = parts.concat();
        if self.used() + bytes.len() as u64 > self.total {
            return Err(FsError::Full);
        }
        let n = bytes.len() as u64;
        self.files.insert(path.to_string(), bytes);
        self.creates.set(self.creates.get() + 1);
        Ok(n)
    }

    fn exists(&self, path: &str) -> bool {
        self.mounted && self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.check()?;
        self.files.get(path).cloned().ok_or(FsError::NotFound)
    }

    fn delete(&mut self, path: &str) -> Result<(), FsError> {
        self.check()?;
        if self.fail_delete {
            return Err(FsError::IoError);
        }
        self.files.remove(path).map(|_| ()).ok_or(FsError::NotFound)
    }

    fn list(&self) -> Result<Vec<FileEntry>, FsError> {
        self.check()?;
        Ok(self
            .files
            .iter()
            .map(|(name, bytes)| FileEntry {
                name: name.clone(),
                size: bytes.len() as u64,
            })
            .collect())
    }

    fn usage(&self) -> Result<FsUsage, FsError> {
        self.check()?;
        Ok(FsUsage {
            used: self.used(),
            total: self.total,
        })
    }
}

// ── File server ───────────────────────────────────────────────

/// Queues raw request heads and records every response.
#[derive(Default)]
pub struct MockServer {
    pub started_with: Option<(String, String, u16)>,
    pub fail_start: Option<NetError>,
    pub start_calls: u32,
    pub pending: VecDeque<Request>,
    pub responses: Vec<Response>,
}

#[allow(dead_code)]
impl MockServer {
    /// Queue `GET <target>`.
    pub fn queue(&mut self, method: &str, target: &str) {
        let head = format!("{method} {target} HTTP/1.1\r\nHost: 192.168.4.1");
        if let Ok(req) = parse_head(head.as_bytes()) {
            self.pending.push_back(req);
        }
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.responses.last()
    }
}

impl FileServerPort for MockServer {
    fn start(&mut self, ssid: &str, password: &str, port: u16) -> Result<SocketAddrV4, NetError> {
        self.start_calls += 1;
        if let Some(e) = self.fail_start {
            return Err(e);
        }
        self.started_with = Some((ssid.to_string(), password.to_string(), port));
        Ok(SocketAddrV4::new(Ipv4Addr::new(192, 168, 4, 1), port))
    }

    fn is_running(&self) -> bool {
        self.started_with.is_some()
    }

    fn poll(&mut self, handler: &mut dyn FnMut(&Request) -> Response) -> bool {
        let Some(req) = self.pending.pop_front() else {
            return false;
        };
        let resp = handler(&req);
        self.responses.push(resp);
        true
    }
}

// ── System / sink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSystem {
    pub restarts: u32,
    pub sleeps: u32,
}

impl SystemPort for RecordingSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn deep_sleep(&mut self) {
        self.sleeps += 1;
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Every mock plus the service under test.
#[derive(Default)]
pub struct Rig {
    pub console: ScriptedConsole,
    pub clock: ManualClock,
    pub probes: ScriptedProbes,
    pub kv: MemKv,
    pub files: MemFiles,
    pub server: MockServer,
    pub system: RecordingSystem,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn ports(&mut self) -> Ports<'_> {
        Ports {
            console: &mut self.console,
            clock: &mut self.clock,
            probes: &mut self.probes,
            kv: &mut self.kv,
            files: &mut self.files,
            server: &mut self.server,
            system: &mut self.system,
            sink: &mut self.sink,
        }
    }

    /// Build and start a service with `config`; boot output is discarded.
    pub fn start(&mut self, config: SystemConfig) -> AppService {
        let mut app = AppService::new(config);
        app.start(&mut self.ports());
        self.console.take_output();
        app
    }

    /// Type `line` and run one loop iteration.
    pub fn send(&mut self, app: &mut AppService, line: &str) -> String {
        self.console.type_line(line);
        app.poll(&mut self.ports());
        self.console.take_output()
    }
}

/// Defaults with the inter-probe settle turned off for speed.
#[allow(dead_code)]
pub fn quick_config() -> SystemConfig {
    SystemConfig {
        probe_settle_ms: 0,
        ..SystemConfig::default()
    }
}
