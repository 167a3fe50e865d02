//! GPIO assignments for the ESP32-C3 diagnostic probes.
//!
//! Single source of truth: every probe references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Chip limits
// ---------------------------------------------------------------------------

/// Highest GPIO number on the ESP32-C3.
pub const MAX_GPIO: i32 = 21;

/// Human-readable list of pins the probes never drive.
/// GPIO9 is the BOOT strap; 18-21 carry USB-Serial-JTAG and UART0.
pub const RESERVED_NOTE: &str = "9 (BOOT), 18-21 (USB/UART)";

// ---------------------------------------------------------------------------
// Pin test
// ---------------------------------------------------------------------------

/// Pins exercised by the pin test, in test order.
pub const PIN_TEST_GPIOS: [i32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 10];

/// Settle after each level change before reading back.
pub const PIN_SETTLE_MS: u32 = 2;
/// Pause between two pins.
pub const PIN_GAP_MS: u32 = 50;

// ---------------------------------------------------------------------------
// LED test
// ---------------------------------------------------------------------------

/// Pins where dev boards commonly wire an on-board LED.
pub const LED_CANDIDATE_GPIOS: [i32; 5] = [2, 3, 7, 8, 10];

pub const LED_BLINKS: u32 = 6;
/// On time and off time of one blink.
pub const LED_PHASE_MS: u32 = 200;
/// Pause between two candidates.
pub const LED_GAP_MS: u32 = 500;

// ---------------------------------------------------------------------------
// Benchmark
// ---------------------------------------------------------------------------

/// Pin toggled by the GPIO benchmark.
pub const BENCH_TOGGLE_GPIO: i32 = 2;
