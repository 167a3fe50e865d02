//! Application core: pure domain logic, zero I/O.
//!
//! Capture buffer, session state, probe orchestration, persistence policy
//! and command dispatch.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod capture;
pub mod commands;
pub mod events;
pub mod orchestrator;
pub mod persistence;
pub mod ports;
pub mod service;
pub mod session;
