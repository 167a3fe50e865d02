//! Export, NVS snapshot, fallback and listing behaviour.

use chipscope::app::events::AppEvent;
use chipscope::app::persistence::{
    COPY_BEGIN, COPY_END, PREVIEW_BYTES, SNAPSHOT_KEY, SNAPSHOT_NAMESPACE, export_footer,
    export_header,
};
use chipscope::app::ports::{FsError, ProbeId, StorageError};
use chipscope::config::SystemConfig;

use crate::mock_hw::{MemFiles, Rig, ScriptedProbes, quick_config};

fn snapshot(rig: &Rig) -> Option<Vec<u8>> {
    rig.kv.get(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY).cloned()
}

// ── Export ────────────────────────────────────────────────────

#[test]
fn export_writes_header_capture_footer() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");
    rig.clock.advance_ms(1234);
    let now = rig.clock.now_us / 1000;

    let out = rig.send(&mut app, "x");

    let path = format!("/diagnostico_{now}.txt");
    let file = rig.files.files.get(&path).expect("export file");
    let expected = [
        export_header(&path, now, false).into_bytes(),
        b"chip report\n".to_vec(),
        export_footer("chip report\n".len()).into_bytes(),
    ]
    .concat();
    assert_eq!(file, &expected);
    assert!(out.contains(&format!("Export saved: {path} ({} bytes)", expected.len())));
    assert!(out.contains("NVS backup: saved"));
    assert!(out.contains("Start the file service (W)"));
}

#[test]
fn export_also_snapshots_to_nvs() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "9");
    rig.send(&mut app, "X");

    let blob = snapshot(&rig).expect("snapshot");
    let captured = app.session().capture().contents();
    assert_eq!(blob.last(), Some(&0));
    assert_eq!(&blob[..blob.len() - 1], captured);
    assert!(rig.sink.events.iter().any(|e| matches!(e, AppEvent::SnapshotSaved { .. })));
}

#[test]
fn snapshot_is_capped_at_slot_size() {
    let mut rig = Rig::default();
    rig.probes = ScriptedProbes::default().with_report(ProbeId::Chip, "z".repeat(300));
    let mut app = rig.start(SystemConfig {
        capture_capacity: 1024,
        snapshot_capacity: 100,
        ..quick_config()
    });
    rig.send(&mut app, "1");
    rig.send(&mut app, "x");

    let blob = snapshot(&rig).expect("snapshot");
    assert_eq!(blob.len(), 100);
    assert_eq!(&blob[..99], "z".repeat(99).as_bytes());
    assert_eq!(blob[99], 0);
    assert!(rig.sink.events.contains(&AppEvent::SnapshotSaved { bytes: 99 }));
}

#[test]
fn empty_capture_exports_nothing() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "x");

    assert!(out.contains("Nothing to export"));
    assert!(rig.files.files.is_empty());
    assert_eq!(snapshot(&rig), None);
    assert!(rig.sink.events.contains(&AppEvent::NothingToExport));
}

#[test]
fn repeated_export_at_same_instant_never_overwrites() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");
    let now = rig.clock.now_us / 1000;

    rig.send(&mut app, "x");
    rig.send(&mut app, "x");
    rig.send(&mut app, "x");

    let names: Vec<_> = rig.files.files.keys().cloned().collect();
    assert_eq!(
        names,
        vec![
            format!("/diagnostico_{now}-1.txt"),
            format!("/diagnostico_{now}-2.txt"),
            format!("/diagnostico_{now}.txt"),
        ]
    );
}

#[test]
fn exports_on_distinct_ticks_get_distinct_files() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");
    let first = rig.clock.now_us / 1000;

    rig.send(&mut app, "x");
    rig.clock.advance_ms(1);
    rig.send(&mut app, "x");

    let a = format!("/diagnostico_{first}.txt");
    let b = format!("/diagnostico_{}.txt", first + 1);
    assert_eq!(rig.files.files.len(), 2);
    assert!(rig.files.files.contains_key(&a));
    assert!(rig.files.files.contains_key(&b));
    assert!(rig.files.text(&b).is_some_and(|t| t.contains(&b)));
}

#[test]
fn truncated_capture_is_flagged_in_header() {
    let mut rig = Rig::default();
    rig.probes = ScriptedProbes::default().with_report(ProbeId::Chip, "q".repeat(700));
    let mut app = rig.start(SystemConfig {
        capture_capacity: 512,
        snapshot_capacity: 256,
        ..quick_config()
    });
    rig.send(&mut app, "1");
    rig.send(&mut app, "x");

    let (_, bytes) = rig.files.files.iter().next().expect("export file");
    let text = String::from_utf8_lossy(bytes);
    assert!(text.contains("Truncated: yes"));
    assert!(text.contains("END OF EXPORT (511 bytes)"));
}

#[test]
fn exporting_does_not_mutate_capture() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "5");
    let before = app.session().capture().contents().to_vec();

    rig.send(&mut app, "x");

    assert_eq!(app.session().capture().contents(), &before[..]);
}

// ── Fallback ──────────────────────────────────────────────────

#[test]
fn unmounted_store_falls_back_to_nvs_and_console() {
    let mut rig = Rig {
        files: MemFiles::unmounted(),
        ..Rig::default()
    };
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");

    let out = rig.send(&mut app, "x");

    assert!(out.contains("[ERROR] cannot write export file: filesystem not mounted"));
    assert!(out.contains("NVS backup: saved"));
    let begin = out.find(COPY_BEGIN).expect("copy begin");
    let end = out.find(COPY_END).expect("copy end");
    assert_eq!(&out[begin + COPY_BEGIN.len()..end], "chip report\n");
    assert!(snapshot(&rig).is_some());
    assert!(rig.sink.events.contains(&AppEvent::ExportFailed(FsError::NotMounted)));
}

#[test]
fn nvs_failure_after_successful_export_is_reported() {
    let mut rig = Rig::default();
    rig.kv.fail_writes = true;
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");

    let out = rig.send(&mut app, "x");

    assert_eq!(rig.files.files.len(), 1);
    assert!(out.contains("NVS backup: FAILED"));
    assert!(rig.sink.events.contains(&AppEvent::SnapshotFailed(StorageError::IoError)));
}

#[test]
fn both_sinks_failing_still_dumps_capture() {
    let mut rig = Rig {
        files: MemFiles::unmounted(),
        ..Rig::default()
    };
    rig.kv.fail_writes = true;
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "3");

    let out = rig.send(&mut app, "x");

    assert!(out.contains("NVS backup: FAILED"));
    assert!(out.contains("wifi report"));
}

#[test]
fn full_store_falls_back() {
    let mut rig = Rig::default();
    rig.files.total = 64;
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "1");

    let out = rig.send(&mut app, "x");

    assert!(rig.files.files.is_empty());
    assert!(out.contains("filesystem full"));
    assert!(out.contains(COPY_BEGIN));
}

// ── Boot notice ───────────────────────────────────────────────

#[test]
fn boot_reports_previous_backup() {
    let mut rig = Rig::default();
    rig.kv.put(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, b"older session\0");

    let mut app = chipscope::app::service::AppService::new(quick_config());
    app.start(&mut rig.ports());
    let out = rig.console.take_output();

    assert!(out.contains("Previous session backup in NVS: 13 bytes"));
    assert!(rig.sink.events.contains(&AppEvent::BackupFound { bytes: 13 }));
    assert!(out.contains("CHIPSCOPE"));
}

#[test]
fn boot_warns_when_store_unmounted() {
    let mut rig = Rig {
        files: MemFiles::unmounted(),
        ..Rig::default()
    };
    let mut app = chipscope::app::service::AppService::new(quick_config());
    app.start(&mut rig.ports());
    let out = rig.console.take_output();

    assert!(out.contains("file store not mounted"));
    assert!(!out.contains("Previous session backup"));
}

// ── Listing ───────────────────────────────────────────────────

#[test]
fn listing_shows_preview_and_usage() {
    let mut rig = Rig::default();
    let long = "L".repeat(PREVIEW_BYTES + 40);
    rig.files.insert("/a.txt", b"short file");
    rig.files.insert("/b.txt", long.as_bytes());
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "y");

    assert!(out.contains("/a.txt  (10 bytes)"));
    assert!(out.contains("short file"));
    assert!(out.contains(&format!("/b.txt  ({} bytes)", PREVIEW_BYTES + 40)));
    assert!(out.contains(&format!("{}\n...", "L".repeat(PREVIEW_BYTES))));
    assert!(!out.contains(&"L".repeat(PREVIEW_BYTES + 1)));
    assert!(out.contains(&format!("2 file(s), {} / 1048576 bytes used", 10 + PREVIEW_BYTES + 40)));
}

#[test]
fn listing_empty_and_unavailable() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    assert!(rig.send(&mut app, "y").contains("no files saved"));

    let mut rig = Rig {
        files: MemFiles::unmounted(),
        ..Rig::default()
    };
    let mut app = rig.start(quick_config());
    assert!(rig.send(&mut app, "Y").contains("storage unavailable"));
}
