//! LED discovery probe.
//!
//! Blinks each candidate pin so an operator watching the board can spot
//! which one drives an LED.  Every pin is released afterwards.

use core::fmt::Write;

use super::{footer, heading};
use crate::app::ports::{ClockPort, ProbeId};
use crate::drivers::gpio::{self, PinMode};
use crate::error::Result;
use crate::pins::{LED_BLINKS, LED_CANDIDATE_GPIOS, LED_GAP_MS, LED_PHASE_MS};

fn blink(pin: i32, clock: &mut dyn ClockPort) -> Result<u32> {
    gpio::configure(pin, PinMode::Output)?;
    let mut done = 0;
    for _ in 0..LED_BLINKS {
        gpio::write(pin, true)?;
        clock.settle(LED_PHASE_MS);
        gpio::write(pin, false)?;
        clock.settle(LED_PHASE_MS);
        done += 1;
    }
    Ok(done)
}

pub fn run(clock: &mut dyn ClockPort) -> String {
    let mut out = heading(ProbeId::LedTest);
    let _ = writeln!(out, "Watch the board; each pin blinks {} times.", LED_BLINKS);

    for &pin in LED_CANDIDATE_GPIOS.iter() {
        let _ = write!(out, "  GPIO{:<2} ", pin);
        match blink(pin, clock) {
            Ok(n) => {
                out.push_str(&"*".repeat(n as usize));
                out.push('\n');
            }
            Err(e) => {
                let _ = writeln!(out, "skipped ({})", e);
            }
        }
        gpio::release(pin);
        clock.settle(LED_GAP_MS);
    }

    let _ = writeln!(
        out,
        "No blink seen? The board LED may sit on another pin or be active-low."
    );
    out.push_str(&footer(ProbeId::LedTest));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        now_us: u64,
        waits: Vec<u32>,
    }

    impl ClockPort for Recorder {
        fn uptime_us(&self) -> u64 {
            self.now_us
        }
        fn settle(&mut self, ms: u32) {
            self.waits.push(ms);
            self.now_us += u64::from(ms) * 1000;
        }
    }

    #[test]
    fn each_candidate_blinks_then_pauses() {
        let mut clock = Recorder { now_us: 0, waits: Vec::new() };
        let text = run(&mut clock);

        for pin in LED_CANDIDATE_GPIOS {
            assert!(text.contains(&format!("GPIO{:<2} ******\n", pin)), "{pin}");
        }
        let per_pin = 2 * LED_BLINKS as usize + 1;
        assert_eq!(clock.waits.len(), LED_CANDIDATE_GPIOS.len() * per_pin);
        assert_eq!(clock.waits[per_pin - 1], LED_GAP_MS);
        assert!(clock.waits[..per_pin - 1].iter().all(|&w| w == LED_PHASE_MS));
    }

    #[test]
    fn pins_are_released() {
        let mut clock = Recorder { now_us: 0, waits: Vec::new() };
        run(&mut clock);
        for pin in LED_CANDIDATE_GPIOS {
            assert!(!gpio::read(pin));
        }
    }
}
