//! Diagnostic orchestration: single probes and the fixed-order full run.
//!
//! Both run to completion on the caller's thread.  Reports are echoed to
//! the console as soon as a probe returns and appended to the session's
//! capture buffer in the same order.

use log::{info, warn};

use super::capture::AppendOutcome;
use super::events::AppEvent;
use super::ports::{ConsolePort, EventSink, Ports, ProbeId};
use super::session::{RunState, Session};

/// Probe order of a full run.  The LED test needs an operator watching the
/// board, so it only runs on request.
pub const FULL_RUN_ORDER: [ProbeId; 8] = [
    ProbeId::Chip,
    ProbeId::Memory,
    ProbeId::WifiScan,
    ProbeId::PinTest,
    ProbeId::System,
    ProbeId::Sensors,
    ProbeId::Benchmark,
    ProbeId::PeerScan,
];

pub const FULL_RUN_START: &str = "\n############ FULL DIAGNOSTIC START ############\n";
pub const FULL_RUN_END: &str = "\n############# FULL DIAGNOSTIC END #############\n";

/// Shown (never captured) when an append loses data.
pub const BUFFER_FULL_WARNING: &str =
    "\n[WARNING] capture buffer full: output truncated, export or clear (C) to continue\n";

pub struct DiagnosticOrchestrator {
    settle_ms: u32,
}

impl DiagnosticOrchestrator {
    pub fn new(settle_ms: u32) -> Self {
        Self { settle_ms }
    }

    /// Append `text` to the capture buffer, warning the operator on loss.
    pub fn record(
        session: &mut Session,
        text: &str,
        console: &mut dyn ConsolePort,
        sink: &mut dyn EventSink,
    ) -> AppendOutcome {
        let outcome = session.capture_mut().append(text);
        match outcome {
            AppendOutcome::Accepted => {}
            AppendOutcome::Truncated { kept, dropped } => {
                warn!("capture: truncated report (kept {kept}, dropped {dropped})");
                console.write_str(BUFFER_FULL_WARNING);
                sink.emit(&AppEvent::CaptureTruncated { kept, dropped });
            }
            AppendOutcome::Rejected { dropped } => {
                warn!("capture: buffer full, dropped {dropped} bytes");
                console.write_str(BUFFER_FULL_WARNING);
                sink.emit(&AppEvent::CaptureTruncated { kept: 0, dropped });
            }
        }
        outcome
    }

    /// `Idle → RunningSingle → Idle`.
    pub fn run_single(&self, session: &mut Session, probe: ProbeId, ports: &mut Ports<'_>) {
        session.state = RunState::RunningSingle(probe);
        self.run_probe(session, probe, ports);
        session.state = RunState::Idle;
    }

    /// `Idle → RunningFull → Idle`.
    ///
    /// Clears the capture buffer, brackets every probe of
    /// [`FULL_RUN_ORDER`] between start and end markers and waits
    /// `settle_ms` between consecutive probes.
    pub fn run_full(&self, session: &mut Session, ports: &mut Ports<'_>) {
        session.state = RunState::RunningFull;
        session.diagnostics_complete = false;
        let started_ms = ports.clock.uptime_ms();

        session.capture_mut().clear();
        ports.sink.emit(&AppEvent::FullRunStarted);
        info!("full run: {} probes, {} ms settle", FULL_RUN_ORDER.len(), self.settle_ms);

        ports.console.write_str(FULL_RUN_START);
        Self::record(session, FULL_RUN_START, &mut *ports.console, &mut *ports.sink);

        for (i, probe) in FULL_RUN_ORDER.iter().enumerate() {
            if i > 0 && self.settle_ms > 0 {
                ports.clock.settle(self.settle_ms);
            }
            self.run_probe(session, *probe, ports);
        }

        ports.console.write_str(FULL_RUN_END);
        Self::record(session, FULL_RUN_END, &mut *ports.console, &mut *ports.sink);

        session.diagnostics_complete = true;
        session.state = RunState::Idle;
        ports.sink.emit(&AppEvent::FullRunCompleted {
            probes: FULL_RUN_ORDER.len(),
            captured: session.capture().len(),
            elapsed_ms: ports.clock.uptime_ms().saturating_sub(started_ms),
        });
    }

    fn run_probe(&self, session: &mut Session, probe: ProbeId, ports: &mut Ports<'_>) {
        let t0 = ports.clock.uptime_ms();
        let report = ports.probes.run(probe, &mut *ports.clock);
        let elapsed_ms = ports.clock.uptime_ms().saturating_sub(t0);

        ports.console.write_str(&report);
        Self::record(session, &report, &mut *ports.console, &mut *ports.sink);

        ports.sink.emit(&AppEvent::ProbeCompleted {
            probe,
            bytes: report.len(),
            elapsed_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_run_order_excludes_led_test() {
        assert!(!FULL_RUN_ORDER.contains(&ProbeId::LedTest));
        assert_eq!(FULL_RUN_ORDER.first(), Some(&ProbeId::Chip));
        assert_eq!(FULL_RUN_ORDER.last(), Some(&ProbeId::PeerScan));
    }

    #[test]
    fn full_run_order_has_no_duplicates() {
        for (i, a) in FULL_RUN_ORDER.iter().enumerate() {
            for b in &FULL_RUN_ORDER[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
