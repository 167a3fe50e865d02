//! ChipScope firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; on the host every
//! adapter and probe runs against a deterministic simulation.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod web;

pub mod adapters;
pub mod drivers;
pub mod probes;
