//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the mock adapters in `mock_hw`.  All tests run on the host
//! (x86_64) with no real hardware required.

mod dispatch_tests;
mod file_service_tests;
mod mock_hw;
mod orchestrator_tests;
mod persistence_tests;
