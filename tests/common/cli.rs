//! Runs the `snapped` binary and checks what it printed.
//!
//! Every run gets a fresh environment map on top of the parent's, so tests
//! can point the binary at a fake server and a private data directory
//! without touching process-wide state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;

/// Builder for invocations of the compiled binary.
///
/// # Example
///
/// ```ignore
/// let home = TempDir::new().unwrap();
/// let cli = CliRunner::new().isolated(home.path()).with_api_url(&server.base_url);
/// cli.run_robot(&["uploads"])
///    .assert_success()
///    .assert_json_field("/total", &json!(0));
/// ```
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: PathBuf,
    env: HashMap<String, String>,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(env!("CARGO_BIN_EXE_snapped")),
            env: HashMap::new(),
        }
    }

    /// Set an environment variable for every later run. Later values win.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Run against a private home: config lookups find nothing and the
    /// ledger lives under `root/data`. Logging is off so stderr carries only
    /// the command's own messages.
    #[must_use]
    pub fn isolated(self, root: &Path) -> Self {
        let home = root.display().to_string();
        let data = root.join("data").display().to_string();
        self.with_env("HOME", &home)
            .with_env("XDG_CONFIG_HOME", &home)
            .with_env("XDG_DATA_HOME", &home)
            .with_env("SNAPPED_DATA_DIR", &data)
            .with_env("RUST_LOG", "off")
    }

    /// Point the binary at a search server.
    #[must_use]
    pub fn with_api_url(self, url: &str) -> Self {
        self.with_env("SNAPPED_API_BASE_URL", url)
    }

    /// Run with `args` and wait for exit.
    ///
    /// # Panics
    ///
    /// Panics if the binary cannot be started.
    pub fn run(&self, args: &[&str]) -> CliResult {
        let output = Command::new(&self.binary)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .unwrap_or_else(|e| panic!("Failed to run {}: {e}", self.binary.display()));

        CliResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Run with `--robot` in front of `args`.
    pub fn run_robot(&self, args: &[&str]) -> CliResult {
        let mut full = vec!["--robot"];
        full.extend_from_slice(args);
        self.run(&full)
    }
}

/// Captured result of one run. Assertions return `&Self` for chaining.
#[derive(Debug, Clone)]
pub struct CliResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub args: Vec<String>,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "snapped {:?} exited with {}\nstderr:\n{}",
            self.args,
            self.exit_code,
            self.stderr
        );
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.success(),
            "snapped {:?} should have failed\nstdout:\n{}",
            self.args,
            self.stdout
        );
        self
    }

    pub fn assert_exit_code(&self, expected: i32) -> &Self {
        assert_eq!(
            self.exit_code, expected,
            "snapped {:?} exit code\nstderr:\n{}",
            self.args, self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "stdout is missing {text:?}:\n{}",
            self.stdout
        );
        self
    }

    pub fn assert_stdout_not_contains(&self, text: &str) -> &Self {
        assert!(
            !self.stdout.contains(text),
            "stdout should not contain {text:?}:\n{}",
            self.stdout
        );
        self
    }

    pub fn assert_stdout_is_empty(&self) -> &Self {
        assert!(self.stdout.is_empty(), "stdout should be empty:\n{}", self.stdout);
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "stderr is missing {text:?}:\n{}",
            self.stderr
        );
        self
    }

    /// Stdout parsed as one JSON document.
    ///
    /// # Panics
    ///
    /// Panics if stdout is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(self.stdout.trim())
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", self.stdout))
    }

    /// Compare the value at a JSON pointer (`/rows/0/search_id`).
    pub fn assert_json_field(&self, pointer: &str, expected: &Value) -> &Self {
        let json = self.json();
        let actual = json
            .pointer(pointer)
            .unwrap_or_else(|| panic!("{pointer} not found in:\n{json:#}"));
        assert_eq!(actual, expected, "value at {pointer}");
        self
    }

    pub fn assert_json_array_len(&self, pointer: &str, expected: usize) -> &Self {
        let json = self.json();
        let len = json
            .pointer(pointer)
            .and_then(Value::as_array)
            .map_or_else(|| panic!("{pointer} is not an array in:\n{json:#}"), Vec::len);
        assert_eq!(len, expected, "length of {pointer}");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_runner_robot_quick_start() {
        let cli = CliRunner::new().with_env("RUST_LOG", "off");
        cli.run_robot(&[])
            .assert_success()
            .assert_json_field("/tool", &Value::String("snapped".to_string()));
    }

    #[test]
    fn test_cli_runner_unknown_command() {
        CliRunner::new().run(&["nonexistent-command"]).assert_failure();
    }
}
