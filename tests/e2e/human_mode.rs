//! Human-mode end-to-end tests.

use tempfile::TempDir;

use crate::common::assertions::{assert_contains_all, assert_no_ansi};
use crate::common::cli::CliRunner;
use crate::common::fixtures::TestImages;
use crate::common::init_test_logging;
use crate::common::logging::LogVerifier;
use crate::common::server::FakeServer;

#[test]
fn human_version_is_not_json() {
    init_test_logging();
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run(&["version"]);
    result.assert_success();

    let stdout = result.stdout.trim();
    assert!(
        serde_json::from_str::<serde_json::Value>(stdout).is_err(),
        "Human mode output should not be JSON"
    );
    assert_contains_all(stdout, &["snapped ", "git: ", "target: "]);
}

#[test]
fn no_color_disables_ansi() {
    init_test_logging();
    let cli = CliRunner::new()
        .with_env("RUST_LOG", "off")
        .with_env("NO_COLOR", "1");
    let result = cli.run(&[]);
    result.assert_success();

    assert_no_ansi(&result.stdout);
    result.assert_stdout_contains("QUICK START");
}

#[test]
fn human_search_shows_results_and_uploads() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let server = FakeServer::start();
    let images = TestImages::single("chair.png", 500, 500);
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url(&server.base_url)
        .with_env("NO_COLOR", "1");

    let result = cli.run(&["search", images.file("chair.png").to_str().unwrap()]);
    result.assert_success();
    assert_no_ansi(&result.stdout);
    assert_contains_all(&result.stdout, &["2 Results", "Match 0", "$19.99"]);

    let uploads = cli.run(&["uploads"]);
    uploads.assert_success();
    assert_contains_all(
        &uploads.stdout,
        &["My Uploads", "snapped results 1"],
    );
}

#[test]
fn human_uploads_empty_message() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new().isolated(home.path());

    let result = cli.run(&["uploads"]);
    result.assert_success();
    result.assert_stdout_contains("No uploads yet");
}

#[test]
fn human_error_has_hint() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new().isolated(home.path());

    let result = cli.run(&["upload", home.path().join("missing.png").to_str().unwrap()]);
    result.assert_exit_code(1);
    result.assert_stderr_contains("Error:");
}

#[test]
fn completions_generate_for_bash() {
    init_test_logging();
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run(&["completions", "bash"]);
    result.assert_success();
    result.assert_stdout_contains("snapped");
}

#[test]
fn verbose_logs_go_to_stderr() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_env("RUST_LOG", "snapped=debug");

    let result = cli.run(&["uploads"]);
    result.assert_success();
    result.assert_stdout_not_contains("DEBUG");

    let _ = LogVerifier::from_stderr(&result.stderr)
        .assert_debug("settings resolved")
        .assert_info("ledger database ready")
        .assert_clean();
}
