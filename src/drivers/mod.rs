//! Low-level peripheral drivers.

pub mod gpio;
pub mod watchdog;
