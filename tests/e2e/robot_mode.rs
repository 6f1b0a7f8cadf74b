//! Robot-mode end-to-end tests.

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::common::assertions::{assert_error_json, assert_json_has_fields};
use crate::common::cli::CliRunner;
use crate::common::fixtures::TestImages;
use crate::common::init_test_logging;
use crate::common::server::FakeServer;

fn parse_json(text: &str) -> Value {
    serde_json::from_str(text)
        .unwrap_or_else(|_| panic!("Failed to parse JSON:\n{text}"))
}

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run(&["--robot"]);
    result.assert_success();

    let json = parse_json(result.stdout.trim());
    assert_eq!(json.get("tool").and_then(|v| v.as_str()), Some("snapped"));
    assert!(json.get("flow").is_some());
    assert!(json.get("output_modes").is_some());
}

#[test]
fn robot_version_has_build_fields() {
    init_test_logging();
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&["version"]);
    result.assert_success();

    let json = assert_json_has_fields(
        result.stdout.trim(),
        &["version", "git_sha", "git_dirty", "rustc_version", "target"],
    );
    assert!(json["git_dirty"].is_boolean());
}

#[test]
fn robot_uploads_empty_on_fresh_home() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new().isolated(home.path());
    let result = cli.run_robot(&["uploads"]);
    result.assert_success();

    result.assert_json_field("/total", &json!(0));
    result.assert_json_array_len("/rows", 0);
}

#[test]
fn robot_search_records_upload_and_prints_results() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start_with(|s| s.next_search_id = 11);
    let shots = TestImages::screenshots(2, 600, 900);
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url);

    let result = cli.run_robot(&["search", shots.path_str()]);
    result.assert_success();
    result
        .assert_json_field("/ok", &json!(true))
        .assert_json_field("/search_id", &json!(11))
        .assert_json_field("/results/count_label", &json!("2 Results"));
    let json = result.json();
    assert!(json["source"].as_str().unwrap().ends_with("shot-1.png"));
    assert_eq!(server.state().uploads.len(), 1);

    let uploads = cli.run_robot(&["uploads"]);
    uploads.assert_success();
    uploads
        .assert_json_field("/total", &json!(1))
        .assert_json_field("/latest_search_id", &json!(11))
        .assert_json_field("/rows/0/search_id", &json!(11));

    let latest = cli.run_robot(&["results", "--latest"]);
    latest.assert_success();
    latest.assert_json_field("/search_id", &json!(11));
}

#[test]
fn robot_search_on_empty_dir_exits_cleanly() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start();
    let empty = TestImages::empty();
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url);

    let result = cli.run_robot(&["search", empty.path_str()]);
    result.assert_success();
    result
        .assert_json_field("/ok", &json!(false))
        .assert_json_field("/exit", &json!("cancelled"));
    assert!(server.state().uploads.is_empty());
}

#[test]
fn robot_failed_search_leaves_no_crop_behind() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start_with(|s| {
        s.search_failure = Some((500, "Vector index offline".to_string()));
    });
    let shots = TestImages::screenshots(1, 600, 900);
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url);

    let result = cli.run_robot(&["search", shots.path_str()]);
    result.assert_exit_code(1);
    assert_error_json(&result.stderr, "server");
    assert_eq!(server.state().uploads.len(), 1);

    let crops = home.path().join("data").join("crops");
    let left = std::fs::read_dir(&crops).map_or(0, Iterator::count);
    assert_eq!(left, 0, "crops left in {}", crops.display());

    cli.run_robot(&["uploads"])
        .assert_success()
        .assert_json_field("/total", &json!(0));
}

#[test]
fn robot_unknown_search_reports_not_found() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start();
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url);

    let result = cli.run_robot(&["results", "999"]);
    result.assert_exit_code(1);
    result.assert_stdout_is_empty();

    let err = assert_error_json(&result.stderr, "not_found");
    assert_eq!(err["recoverable"], true);
}

#[test]
fn robot_unreachable_server_is_network_error() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&format!("http://127.0.0.1:{port}/api/v1"));

    let result = cli.run_robot(&["history"]);
    result.assert_failure();
    let err = assert_error_json(&result.stderr, "network");
    assert!(err["suggestion"].is_string());
}

#[test]
fn robot_latest_without_uploads_fails() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new().isolated(home.path());

    let result = cli.run_robot(&["results", "--latest"]);
    result.assert_failure();
    let err = assert_error_json(&result.stderr, "other");
    assert!(err["message"].as_str().unwrap().contains("No uploads"));
}

#[test]
fn robot_crop_writes_requested_file() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let images = TestImages::single("wide.png", 400, 200);
    let out = home.path().join("out").join("crop.jpg");
    let cli = CliRunner::new().isolated(home.path());

    let result = cli.run_robot(&[
        "crop",
        images.file("wide.png").to_str().unwrap(),
        "--crop",
        "none",
        "--out",
        out.to_str().unwrap(),
    ]);
    result.assert_success();
    result
        .assert_json_field("/source_width", &json!(400))
        .assert_json_field("/region/width", &json!(400));
    assert!(out.exists());
}

#[test]
fn robot_history_lists_server_searches() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start();
    let images = TestImages::single("cup.png", 64, 64);
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url);

    cli.run_robot(&["search", images.path_str(), "--crop", "none", "--no-results"])
        .assert_success();

    let result = cli.run_robot(&["history", "--limit", "5"]);
    result.assert_success();
    result
        .assert_json_field("/total", &json!(1))
        .assert_json_array_len("/searches", 1);
}
