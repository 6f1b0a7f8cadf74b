//! Environment variable behavior end-to-end tests.

use tempfile::TempDir;

use crate::common::assertions::assert_error_json;
use crate::common::cli::CliRunner;
use crate::common::fixtures::TestConfig;
use crate::common::init_test_logging;

#[test]
fn snapped_format_env_sets_json_output() {
    init_test_logging();
    let cli = CliRunner::new()
        .with_env("RUST_LOG", "off")
        .with_env("SNAPPED_FORMAT", "json");
    let result = cli.run(&["version"]);
    result.assert_success();

    let json: serde_json::Value = serde_json::from_str(result.stdout.trim())
        .expect("Expected JSON output with SNAPPED_FORMAT=json");
    assert!(json.get("version").is_some());
}

#[test]
fn snapped_format_env_sets_compact_json() {
    init_test_logging();
    let cli = CliRunner::new()
        .with_env("RUST_LOG", "off")
        .with_env("SNAPPED_FORMAT", "json-compact");
    let result = cli.run(&["version"]);
    result.assert_success();

    let stdout = result.stdout.trim_end();
    let json: serde_json::Value = serde_json::from_str(stdout)
        .expect("Expected JSON output with SNAPPED_FORMAT=json-compact");
    assert!(json.get("version").is_some());
    assert_eq!(stdout.lines().count(), 1, "Expected compact JSON single line");
}

#[test]
fn cli_format_flag_overrides_env() {
    init_test_logging();
    let cli = CliRunner::new()
        .with_env("RUST_LOG", "off")
        .with_env("SNAPPED_FORMAT", "json");
    let result = cli.run(&["version", "--format=text"]);
    result.assert_success();

    assert!(
        serde_json::from_str::<serde_json::Value>(result.stdout.trim()).is_err(),
        "--format=text should override SNAPPED_FORMAT=json"
    );
}

#[test]
fn api_url_env_and_flag_precedence() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_api_url("http://env.example:1/api/v1");

    let result = cli.run_robot(&["config"]);
    result.assert_success();
    result.assert_json_field(
        "/settings/api/base_url",
        &serde_json::json!("http://env.example:1/api/v1"),
    );

    let result = cli.run_robot(&["--api-url", "http://flag.example:2/api/v1", "config"]);
    result.assert_success();
    result.assert_json_field(
        "/settings/api/base_url",
        &serde_json::json!("http://flag.example:2/api/v1"),
    );
}

#[test]
fn config_file_is_read_and_reported() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let config = TestConfig::toml(
        r#"
[api]
base_url = "http://file.example:3/api/v1"

[history]
limit = 5
"#,
    );
    let cli = CliRunner::new()
        .isolated(home.path())
        .with_env("SNAPPED_CONFIG", config.path_str());

    let result = cli.run_robot(&["config"]);
    result.assert_success();
    result.assert_json_field("/settings/history/limit", &serde_json::json!(5));
    result.assert_json_field("/source", &serde_json::json!(config.path_str()));
}

#[test]
fn missing_explicit_config_fails() {
    init_test_logging();
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.toml");
    let cli = CliRunner::new().isolated(home.path());

    let result = cli.run_robot(&["--config", missing.to_str().unwrap(), "uploads"]);
    result.assert_failure();
    assert_error_json(&result.stderr, "config");
}
