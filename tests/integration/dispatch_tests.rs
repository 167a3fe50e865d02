//! Command dispatch: parsing, echo, help, unknown input, power commands.

use chipscope::app::commands::MENU;
use chipscope::app::events::AppEvent;
use chipscope::app::ports::ProbeId;
use chipscope::config::SystemConfig;

use crate::mock_hw::{Rig, quick_config};

#[test]
fn boot_prints_menu_and_started_event() {
    let mut rig = Rig::default();
    let mut app = chipscope::app::service::AppService::new(quick_config());
    app.start(&mut rig.ports());

    assert!(rig.console.output.ends_with(MENU));
    assert_eq!(
        rig.sink.events.first(),
        Some(&AppEvent::Started {
            capture_capacity: 8192,
            snapshot_capacity: 4000,
        })
    );
}

#[test]
fn blank_lines_do_nothing() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "   ");

    assert!(out.is_empty());
    assert!(rig.probes.calls.is_empty());
}

#[test]
fn commands_are_case_insensitive() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "a");
    rig.send(&mut app, "A");

    assert_eq!(rig.probes.calls, vec![ProbeId::PeerScan, ProbeId::PeerScan]);
}

#[test]
fn help_shows_menu() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    assert!(rig.send(&mut app, "help").contains(MENU));
    assert!(rig.send(&mut app, "H").contains(MENU));
}

#[test]
fn unknown_input_is_reported_and_ignored() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "zz");

    assert!(out.contains("Unknown command 'zz'"));
    assert!(app.session().capture().is_empty());
    assert!(rig.sink.events.contains(&AppEvent::UnknownCommand("zz".to_string())));
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::CommandAccepted(_))));
}

#[test]
fn accepted_commands_are_logged_by_name() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    rig.send(&mut app, "9");
    rig.send(&mut app, "x");

    assert!(rig.sink.events.contains(&AppEvent::CommandAccepted("full_run")));
    assert!(rig.sink.events.contains(&AppEvent::CommandAccepted("export")));
}

#[test]
fn reset_waits_then_restarts() {
    let mut rig = Rig::default();
    let mut app = rig.start(SystemConfig {
        restart_delay_ms: 1000,
        ..quick_config()
    });

    let out = rig.send(&mut app, "reset");

    assert!(out.contains("Restarting in 1000 ms"));
    assert_eq!(rig.clock.settles, vec![1000]);
    assert_eq!(rig.system.restarts, 1);
    assert_eq!(rig.system.sleeps, 0);
    assert!(rig.sink.events.contains(&AppEvent::PowerRequested { sleep: false }));
}

#[test]
fn sleep_waits_then_sleeps() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "SLEEP");

    assert!(out.contains("deep sleep"));
    assert_eq!(rig.clock.settles, vec![500]);
    assert_eq!(rig.system.sleeps, 1);
    assert_eq!(rig.system.restarts, 0);
}

#[test]
fn one_line_per_poll() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.console.type_line("1");
    rig.console.type_line("2");

    app.poll(&mut rig.ports());
    assert_eq!(rig.probes.calls, vec![ProbeId::Chip]);
    app.poll(&mut rig.ports());
    assert_eq!(rig.probes.calls, vec![ProbeId::Chip, ProbeId::Memory]);
}

#[test]
fn idle_poll_reports_no_work() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    assert!(!app.poll(&mut rig.ports()));
}
