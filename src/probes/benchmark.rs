//! CPU, GPIO and allocator micro-benchmarks.
//!
//! Timings come from the clock port in microseconds.  A run that finishes
//! inside one timer tick reports "below timer resolution" instead of a
//! rate.

use core::fmt::Write;
use std::hint::black_box;

use super::{footer, heading};
use crate::app::ports::{ClockPort, ProbeId};
use crate::drivers::gpio::{self, PinMode};
use crate::pins::BENCH_TOGGLE_GPIO;

pub const FLOAT_OPS: u32 = 10_000;
pub const GPIO_TOGGLES: u32 = 5_000;
pub const STRING_APPENDS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchResult {
    pub name: &'static str,
    pub iterations: u32,
    pub elapsed_us: u64,
}

impl BenchResult {
    /// Operations per second, `None` when the run was too fast to time.
    pub fn ops_per_sec(&self) -> Option<u64> {
        if self.elapsed_us == 0 {
            return None;
        }
        Some(u64::from(self.iterations) * 1_000_000 / self.elapsed_us)
    }
}

fn timed(
    clock: &dyn ClockPort,
    name: &'static str,
    iterations: u32,
    mut body: impl FnMut(),
) -> BenchResult {
    let start = clock.uptime_us();
    body();
    BenchResult {
        name,
        iterations,
        elapsed_us: clock.uptime_us().saturating_sub(start),
    }
}

fn float_math(clock: &dyn ClockPort) -> BenchResult {
    timed(clock, "float sqrt*mul", FLOAT_OPS, || {
        let mut acc = 0.0f32;
        for i in 0..FLOAT_OPS {
            acc += black_box(i as f32).sqrt() * core::f32::consts::PI;
        }
        black_box(acc);
    })
}

fn gpio_toggle(clock: &dyn ClockPort) -> Option<BenchResult> {
    gpio::configure(BENCH_TOGGLE_GPIO, PinMode::Output).ok()?;
    let result = timed(clock, "gpio toggle", GPIO_TOGGLES, || {
        for i in 0..GPIO_TOGGLES {
            let _ = gpio::write(BENCH_TOGGLE_GPIO, i % 2 == 0);
        }
    });
    gpio::release(BENCH_TOGGLE_GPIO);
    Some(result)
}

fn string_append(clock: &dyn ClockPort) -> BenchResult {
    timed(clock, "string append", STRING_APPENDS, || {
        let mut s = String::new();
        for i in 0..STRING_APPENDS {
            let _ = write!(s, "{}", i);
        }
        black_box(s);
    })
}

pub fn run(clock: &mut dyn ClockPort) -> String {
    let results = [Some(float_math(clock)), gpio_toggle(clock), Some(string_append(clock))];
    report(&results)
}

pub fn report(results: &[Option<BenchResult>]) -> String {
    let mut out = heading(ProbeId::Benchmark);
    for r in results {
        match r {
            Some(r) => {
                let _ = write!(
                    out,
                    "  {:<15} {:>6} ops in {:>7} us  ",
                    r.name, r.iterations, r.elapsed_us
                );
                match r.ops_per_sec() {
                    Some(rate) => {
                        let _ = writeln!(out, "{} ops/s", rate);
                    }
                    None => {
                        let _ = writeln!(out, "below timer resolution");
                    }
                }
            }
            None => {
                let _ = writeln!(out, "  gpio toggle     skipped (GPIO{} unavailable)", BENCH_TOGGLE_GPIO);
            }
        }
    }
    out.push_str(&footer(ProbeId::Benchmark));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Frozen;

    impl ClockPort for Frozen {
        fn uptime_us(&self) -> u64 {
            1_000
        }
        fn settle(&mut self, _ms: u32) {}
    }

    #[test]
    fn rate_from_elapsed() {
        let r = BenchResult { name: "x", iterations: 10_000, elapsed_us: 2_500 };
        assert_eq!(r.ops_per_sec(), Some(4_000_000));
        let fast = BenchResult { elapsed_us: 0, ..r };
        assert_eq!(fast.ops_per_sec(), None);
    }

    #[test]
    fn frozen_clock_never_divides_by_zero() {
        let text = run(&mut Frozen);
        assert_eq!(text.matches("below timer resolution").count(), 3);
        assert!(text.contains("gpio toggle"));
        assert!(!gpio::read(BENCH_TOGGLE_GPIO));
    }

    #[test]
    fn report_formats_rates_and_skips() {
        let r = BenchResult { name: "string append", iterations: 500, elapsed_us: 250 };
        let text = report(&[Some(r), None]);
        assert!(text.contains("2000000 ops/s"));
        assert!(text.contains("skipped (GPIO2 unavailable)"));
    }
}
