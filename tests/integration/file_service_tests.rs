//! File service start-up and HTTP routes, served through the run loop.

use chipscope::app::events::AppEvent;
use chipscope::app::persistence::{SNAPSHOT_KEY, SNAPSHOT_NAMESPACE};
use chipscope::app::ports::NetError;

use crate::mock_hw::{MemFiles, Rig, quick_config};

fn body(rig: &Rig) -> String {
    let resp = rig.server.last_response().expect("a response");
    String::from_utf8_lossy(&resp.body).into_owned()
}

fn status(rig: &Rig) -> u16 {
    rig.server.last_response().expect("a response").status
}

/// Start the service and the file server, discarding output.
fn serving_rig() -> (Rig, chipscope::app::service::AppService) {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "w");
    (rig, app)
}

fn request(rig: &mut Rig, app: &mut chipscope::app::service::AppService, target: &str) {
    rig.server.queue("GET", target);
    app.poll(&mut rig.ports());
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_uses_configured_credentials() {
    let mut rig = Rig::default();
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "W");

    assert_eq!(
        rig.server.started_with,
        Some(("ESP32-Diag".to_string(), "diagnostico".to_string(), 80))
    );
    assert!(out.contains("SSID:     ESP32-Diag"));
    assert!(out.contains("http://192.168.4.1:80/"));
    assert!(app.session().file_service_active());
}

#[test]
fn second_start_is_a_no_op() {
    let (mut rig, mut app) = serving_rig();
    let out = rig.send(&mut app, "w");

    assert_eq!(rig.server.start_calls, 1);
    assert!(out.contains("already running"));
}

#[test]
fn failed_start_leaves_service_inactive() {
    let mut rig = Rig::default();
    rig.server.fail_start = Some(NetError::ApStartFailed);
    let mut app = rig.start(quick_config());

    let out = rig.send(&mut app, "w");

    assert!(out.contains("[ERROR] file service failed to start: access point failed to start"));
    assert!(!app.session().file_service_active());
    assert!(rig.sink.events.contains(&AppEvent::FileServiceFailed(NetError::ApStartFailed)));

    // Nothing is served before a successful start.
    rig.server.queue("GET", "/list");
    app.poll(&mut rig.ports());
    assert!(rig.server.responses.is_empty());
}

#[test]
fn export_mentions_download_url_once_serving() {
    let (mut rig, mut app) = serving_rig();
    rig.send(&mut app, "1");
    let out = rig.send(&mut app, "x");
    assert!(out.contains("Download: http://192.168.4.1:80/"));
}

// ── Routes ────────────────────────────────────────────────────

#[test]
fn index_page_lists_files() {
    let (mut rig, mut app) = serving_rig();
    rig.files.insert("/diagnostico_10.txt", b"hello");

    request(&mut rig, &mut app, "/");

    assert_eq!(status(&rig), 200);
    let page = body(&rig);
    assert!(page.contains("diagnostico_10.txt"));
    assert!(page.contains("/download?file="));
    assert!(page.contains("/delete?file="));
}

#[test]
fn list_route_returns_json() {
    let (mut rig, mut app) = serving_rig();
    rig.files.insert("/a.txt", b"abc");
    rig.files.insert("/b.txt", b"");

    request(&mut rig, &mut app, "/list");

    assert_eq!(status(&rig), 200);
    let v: serde_json::Value = serde_json::from_str(&body(&rig)).expect("json");
    assert_eq!(v["files"][0]["name"], "/a.txt");
    assert_eq!(v["files"][0]["size"], 3);
    assert_eq!(v["files"][1]["name"], "/b.txt");
    assert_eq!(v["used"], 3);
    assert_eq!(v["total"], 1024 * 1024);
}

#[test]
fn download_returns_exact_bytes() {
    let (mut rig, mut app) = serving_rig();
    rig.files.insert("/d.txt", b"line one\nline two\n");

    request(&mut rig, &mut app, "/download?file=d.txt");

    let resp = rig.server.last_response().expect("response");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"line one\nline two\n");
    assert!(resp.headers.contains(&(
        "Content-Disposition",
        "attachment; filename=\"d.txt\"".to_string()
    )));
    assert!(resp.encode_head().contains("Content-Length: 18\r\n"));
}

#[test]
fn download_of_missing_file_is_404() {
    let (mut rig, mut app) = serving_rig();
    request(&mut rig, &mut app, "/download?file=%2Fnope.txt");
    assert_eq!(status(&rig), 404);
}

#[test]
fn delete_removes_file() {
    let (mut rig, mut app) = serving_rig();
    rig.files.insert("/gone.txt", b"x");

    request(&mut rig, &mut app, "/delete?file=/gone.txt");

    assert_eq!(status(&rig), 200);
    assert!(rig.files.files.is_empty());
}

#[test]
fn delete_errors() {
    let (mut rig, mut app) = serving_rig();

    request(&mut rig, &mut app, "/delete");
    assert_eq!(status(&rig), 400);

    request(&mut rig, &mut app, "/delete?file=");
    assert_eq!(status(&rig), 400);

    request(&mut rig, &mut app, "/delete?file=missing.txt");
    assert_eq!(status(&rig), 500);

    rig.files.insert("/kept.txt", b"x");
    rig.files.fail_delete = true;
    request(&mut rig, &mut app, "/delete?file=kept.txt");
    assert_eq!(status(&rig), 500);
    assert!(rig.files.files.contains_key("/kept.txt"));
}

#[test]
fn deleting_missing_file_leaves_store_untouched() {
    let (mut rig, mut app) = serving_rig();
    rig.files.insert("/diagnostico_1.txt", b"one");
    rig.files.insert("/diagnostico_2.txt", b"two");

    request(&mut rig, &mut app, "/list");
    let before = body(&rig);

    request(&mut rig, &mut app, "/delete?file=/missing.txt");
    assert_eq!(status(&rig), 500);

    request(&mut rig, &mut app, "/list");
    assert_eq!(status(&rig), 200);
    assert_eq!(body(&rig), before);
    assert_eq!(rig.files.text("/diagnostico_1.txt").as_deref(), Some("one"));
    assert_eq!(rig.files.text("/diagnostico_2.txt").as_deref(), Some("two"));
}

#[test]
fn traversal_and_unknown_routes() {
    let (mut rig, mut app) = serving_rig();

    request(&mut rig, &mut app, "/download?file=../secret");
    assert_eq!(status(&rig), 400);

    request(&mut rig, &mut app, "/upload");
    assert_eq!(status(&rig), 404);

    rig.server.queue("POST", "/delete?file=a.txt");
    app.poll(&mut rig.ports());
    assert_eq!(status(&rig), 405);
}

#[test]
fn unmounted_store_answers_500() {
    let mut rig = Rig {
        files: MemFiles::unmounted(),
        ..Rig::default()
    };
    let mut app = rig.start(quick_config());
    rig.send(&mut app, "w");

    request(&mut rig, &mut app, "/list");
    assert_eq!(status(&rig), 500);

    request(&mut rig, &mut app, "/");
    assert_eq!(status(&rig), 500);
}

#[test]
fn routes_never_touch_capture_or_snapshot() {
    let (mut rig, mut app) = serving_rig();
    rig.send(&mut app, "1");
    rig.send(&mut app, "x");
    let capture = app.session().capture().contents().to_vec();
    let blob = rig.kv.get(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY).cloned();
    let writes = rig.kv.writes;

    let name = rig.files.files.keys().next().cloned().expect("export");
    request(&mut rig, &mut app, &format!("/delete?file={name}"));
    request(&mut rig, &mut app, "/list");

    assert!(rig.files.files.is_empty());
    assert_eq!(app.session().capture().contents(), &capture[..]);
    assert_eq!(rig.kv.get(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY).cloned(), blob);
    assert_eq!(rig.kv.writes, writes);
}

#[test]
fn each_request_is_logged() {
    let (mut rig, mut app) = serving_rig();
    request(&mut rig, &mut app, "/list");

    assert!(rig.sink.events.contains(&AppEvent::HttpServed {
        method: "GET".to_string(),
        path: "/list".to_string(),
        status: 200,
    }));
}

#[test]
fn one_request_per_poll() {
    let (mut rig, mut app) = serving_rig();
    rig.server.queue("GET", "/list");
    rig.server.queue("GET", "/list");

    app.poll(&mut rig.ports());
    assert_eq!(rig.server.responses.len(), 1);
    app.poll(&mut rig.ports());
    assert_eq!(rig.server.responses.len(), 2);
}
