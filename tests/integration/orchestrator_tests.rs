//! Single-probe and full-run behaviour of the diagnostic orchestrator,
//! driven through the service with scripted probes.

use chipscope::app::capture::CLEARED_MARKER;
use chipscope::app::events::AppEvent;
use chipscope::app::orchestrator::{
    BUFFER_FULL_WARNING, FULL_RUN_END, FULL_RUN_ORDER, FULL_RUN_START,
};
use chipscope::app::ports::ProbeId;
use chipscope::app::session::RunState;
use chipscope::config::SystemConfig;

use crate::mock_hw::{Rig, ScriptedProbes, quick_config};

// ── Single probes ─────────────────────────────────────────────

#[test]
fn single_probe_echoes_and_appends() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "1");

    assert_eq!(rig.probes.calls, vec![ProbeId::Chip]);
    assert!(out.contains("> 1\n"));
    assert!(out.contains("chip report\n"));
    assert_eq!(app.session().capture().contents(), b"chip report\n");
    assert_eq!(app.session().state(), RunState::Idle);
}

#[test]
fn single_probes_accumulate_in_order() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "2");
    rig.send(&mut app, "a");
    rig.send(&mut app, "7");

    assert_eq!(
        app.session().capture().as_text(),
        "memory report\nble report\nleds report\n"
    );
    assert!(!app.session().diagnostics_complete());
}

#[test]
fn probe_completion_is_logged_with_timing() {
    let mut rig = Rig::default();
    rig.probes.cost_ms = 40;
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "6");

    assert!(rig.sink.events.contains(&AppEvent::ProbeCompleted {
        probe: ProbeId::Sensors,
        bytes: "sensors report\n".len(),
        elapsed_ms: 40,
    }));
}

// ── Full run ──────────────────────────────────────────────────

#[test]
fn full_run_visits_every_probe_in_order() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "9");

    assert_eq!(rig.probes.calls, FULL_RUN_ORDER.to_vec());
    assert!(!rig.probes.calls.contains(&ProbeId::LedTest));

    let mut expected = format!("{CLEARED_MARKER}{FULL_RUN_START}");
    for probe in FULL_RUN_ORDER {
        expected.push_str(&ScriptedProbes::report_for(probe));
    }
    expected.push_str(FULL_RUN_END);
    assert_eq!(app.session().capture().as_text(), expected);

    assert!(out.contains("Full diagnostic complete"));
    assert!(app.session().diagnostics_complete());
    assert_eq!(app.session().state(), RunState::Idle);
}

#[test]
fn full_run_discards_earlier_captures() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "1");
    rig.send(&mut app, "c");
    rig.send(&mut app, "9");

    let text = app.session().capture().as_text().into_owned();
    let body = text.strip_prefix(CLEARED_MARKER).expect("cleared marker first");
    assert!(body.starts_with(FULL_RUN_START));
    assert_eq!(text.matches(CLEARED_MARKER).count(), 1);
    assert_eq!(text.matches("chip report").count(), 1);
}

#[test]
fn full_run_settles_between_probes() {
    let mut rig = Rig::default();
    let mut app = rig.start(SystemConfig {
        probe_settle_ms: 1000,
        ..SystemConfig::default()
    });

    rig.send(&mut app, "9");

    let settles = rig.clock.settles.iter().filter(|&&ms| ms == 1000).count();
    assert_eq!(settles, FULL_RUN_ORDER.len() - 1);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::FullRunCompleted { probes: 8, elapsed_ms: 7000, .. }
    )));
}

#[test]
fn clear_after_full_run_resets_complete_flag() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "9");
    assert!(app.session().diagnostics_complete());

    let out = rig.send(&mut app, "C");
    assert!(out.contains("Capture buffer cleared"));
    assert!(!app.session().diagnostics_complete());
    assert_eq!(app.session().capture().contents(), CLEARED_MARKER.as_bytes());
    assert!(rig.sink.events.contains(&AppEvent::CaptureCleared));
}

// ── Capacity ──────────────────────────────────────────────────

#[test]
fn overflow_keeps_prefix_and_warns_once_per_append() {
    let mut rig = Rig::default();
    rig.probes = ScriptedProbes::default().with_report(ProbeId::Memory, "m".repeat(600));
    let mut app = rig.start(SystemConfig {
        capture_capacity: 512,
        ..quick_config()
    });

    let out = rig.send(&mut app, "2");
    assert_eq!(app.session().capture().len(), 511);
    assert!(app.session().capture().was_truncated());
    assert_eq!(out.matches(BUFFER_FULL_WARNING).count(), 1);
    // The echoed report is complete even though the capture is not.
    assert!(out.contains(&"m".repeat(600)));

    let out = rig.send(&mut app, "2");
    assert_eq!(app.session().capture().len(), 511);
    assert_eq!(out.matches(BUFFER_FULL_WARNING).count(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CaptureTruncated { kept: 0, dropped: 600 })),
        1
    );
}

#[test]
fn warning_text_is_never_captured() {
    let mut rig = Rig::default();
    rig.probes = ScriptedProbes::default().with_report(ProbeId::Chip, "c".repeat(1000));
    let mut app = rig.start(SystemConfig {
        capture_capacity: 512,
        ..quick_config()
    });

    rig.send(&mut app, "9");

    let text = app.session().capture().as_text().into_owned();
    assert!(!text.contains("[WARNING]"));
    assert!(app.session().diagnostics_complete());
}
