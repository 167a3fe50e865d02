//! Unified error types for the ChipScope firmware.
//!
//! Every subsystem error converts into a single `Error` enum so adapter
//! bring-up in `main` can funnel failures through one path.  All variants
//! are `Copy`; none of them carry heap data.

use core::fmt;

use crate::app::ports::{FsError, NetError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible bring-up operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The NVS key-value store failed.
    Storage(StorageError),
    /// The hierarchical file store failed.
    Fs(FsError),
    /// The SoftAP or HTTP listener failed.
    Net(NetError),
    /// A pin could not be configured.
    Gpio(GpioError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Fs(e) => write!(f, "fs: {e}"),
            Self::Net(e) => write!(f, "net: {e}"),
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<FsError> for Error {
    fn from(e: FsError) -> Self {
        Self::Fs(e)
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

// ---------------------------------------------------------------------------
// GPIO errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// The pin number is not usable on this chip.
    InvalidPin(i32),
    /// `gpio_config` or a level write returned an ESP-IDF error code.
    Driver(i32),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "GPIO{pin} is not usable"),
            Self::Driver(code) => write!(f, "driver error {code}"),
        }
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
