//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (console, probes, storage, network) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them
//! through a [`Ports`] bundle, so the domain core never touches hardware
//! directly.
//!
//! All port errors are typed, and callers must handle every variant explicitly.

use core::fmt;
use std::net::SocketAddrV4;

use crate::config::SystemConfig;
use crate::web::codec::{Request, Response};

// ───────────────────────────────────────────────────────────────
// Console port (driven adapter: operator ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Line-oriented operator channel (UART / USB-CDC on device, stdin on host).
pub trait ConsolePort {
    /// Return one complete input line if available.  Never blocks.
    fn poll_line(&mut self) -> Option<String>;

    /// Write text verbatim to the operator.
    fn write_str(&mut self, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus synchronous settle waits.
pub trait ClockPort {
    /// Microseconds since boot.
    fn uptime_us(&self) -> u64;

    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }

    /// Block the run loop for `ms` milliseconds.
    fn settle(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Probe port (driven adapter: hardware → report text)
// ───────────────────────────────────────────────────────────────

/// Identifies one hardware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeId {
    Chip,
    Memory,
    WifiScan,
    PinTest,
    System,
    Sensors,
    LedTest,
    Benchmark,
    PeerScan,
}

impl ProbeId {
    pub const ALL: [ProbeId; 9] = [
        Self::Chip,
        Self::Memory,
        Self::WifiScan,
        Self::PinTest,
        Self::System,
        Self::Sensors,
        Self::LedTest,
        Self::Benchmark,
        Self::PeerScan,
    ];

    /// Human-readable section title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Chip => "CHIP INFORMATION",
            Self::Memory => "MEMORY ANALYSIS",
            Self::WifiScan => "WIFI SCAN",
            Self::PinTest => "GPIO TEST",
            Self::System => "SYSTEM INFORMATION",
            Self::Sensors => "INTERNAL SENSORS",
            Self::LedTest => "LED TEST",
            Self::Benchmark => "PERFORMANCE BENCHMARK",
            Self::PeerScan => "BLE SCAN",
        }
    }

    /// Short machine tag used in log records.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Chip => "chip",
            Self::Memory => "memory",
            Self::WifiScan => "wifi",
            Self::PinTest => "pins",
            Self::System => "system",
            Self::Sensors => "sensors",
            Self::LedTest => "leds",
            Self::Benchmark => "bench",
            Self::PeerScan => "ble",
        }
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Runs a probe to completion and returns its report.
///
/// Probes may block on `clock.settle()` for hardware settling; they never
/// fail. A probe that cannot read its peripheral says so in the report.
pub trait ProbePort {
    fn run(&mut self, probe: ProbeId, clock: &mut dyn ClockPort) -> String;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic, with no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// File store port (driven adapter: domain ↔ SPIFFS)
// ───────────────────────────────────────────────────────────────

/// One non-directory entry of the file store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileEntry {
    /// Absolute name within the store, always starting with `/`.
    pub name: String,
    pub size: u64,
}

/// Aggregate capacity of the file store, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsUsage {
    pub used: u64,
    pub total: u64,
}

/// Hierarchical named-file store.  Names are store-absolute (`/x.txt`).
pub trait FileStorePort {
    /// `false` if the store failed to mount.
    fn is_ready(&self) -> bool;

    /// Create `path` with the concatenation of `parts`.
    ///
    /// Fails with [`FsError::AlreadyExists`] instead of overwriting.
    /// Returns the number of bytes written.
    fn create(&mut self, path: &str, parts: &[&[u8]]) -> Result<u64, FsError>;

    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Read at most `max` bytes from the start of `path`.
    fn read_prefix(&self, path: &str, max: usize) -> Result<Vec<u8>, FsError> {
        let mut bytes = self.read(path)?;
        bytes.truncate(max);
        Ok(bytes)
    }

    fn delete(&mut self, path: &str) -> Result<(), FsError>;

    /// Every non-directory entry, sorted by name.
    fn list(&self) -> Result<Vec<FileEntry>, FsError>;

    fn usage(&self) -> Result<FsUsage, FsError>;
}

// ───────────────────────────────────────────────────────────────
// File server port (driven adapter: SoftAP + HTTP listener)
// ───────────────────────────────────────────────────────────────

/// Network side of the file service.  Once started it runs until restart.
pub trait FileServerPort {
    /// Bring up the access point and bind the listener.
    fn start(&mut self, ssid: &str, password: &str, port: u16) -> Result<SocketAddrV4, NetError>;

    fn is_running(&self) -> bool;

    /// Serve at most one pending connection through `handler`.
    /// Returns `true` if a request was served.
    fn poll(&mut self, handler: &mut dyn FnMut(&Request) -> Response) -> bool;
}

// ───────────────────────────────────────────────────────────────
// System control port
// ───────────────────────────────────────────────────────────────

/// Device power control.  On hardware neither call returns.
pub trait SystemPort {
    fn restart(&mut self);
    fn deep_sleep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Every driven port the service touches during one loop iteration.
pub struct Ports<'a> {
    pub console: &'a mut dyn ConsolePort,
    pub clock: &'a mut dyn ClockPort,
    pub probes: &'a mut dyn ProbePort,
    pub kv: &'a mut dyn StoragePort,
    pub files: &'a mut dyn FileStorePort,
    pub server: &'a mut dyn FileServerPort,
    pub system: &'a mut dyn SystemPort,
    pub sink: &'a mut dyn EventSink,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// NVS could not be initialised.
    Unavailable,
}

/// Errors from [`FileStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// The filesystem failed to mount at boot.
    NotMounted,
    NotFound,
    /// Create-new collided with an existing file.
    AlreadyExists,
    /// Name is empty, relative after normalisation, or escapes the mount point.
    InvalidName,
    /// Partition has no room left.
    Full,
    IoError,
}

/// Errors from [`FileServerPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// SSID or password rejected before touching the radio.
    InvalidCredentials,
    /// The radio refused the access point configuration.
    ApStartFailed,
    /// The HTTP listener could not bind.
    BindFailed,
    /// A station or BLE scan could not be started.
    ScanFailed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Unavailable => write!(f, "NVS unavailable"),
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => write!(f, "filesystem not mounted"),
            Self::NotFound => write!(f, "file not found"),
            Self::AlreadyExists => write!(f, "file already exists"),
            Self::InvalidName => write!(f, "invalid file name"),
            Self::Full => write!(f, "filesystem full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid access point credentials"),
            Self::ApStartFailed => write!(f, "access point failed to start"),
            Self::BindFailed => write!(f, "HTTP listener failed to bind"),
            Self::ScanFailed => write!(f, "radio scan failed"),
        }
    }
}
