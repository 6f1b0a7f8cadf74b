//! Output mode abstraction for robot and human output.

use std::path::Path;

use serde::Serialize;

use crate::acquire::AcquiredImage;
use crate::api::{ClipRecord, SearchId, SearchList, UploadRecord};
use crate::cli::Cli;
use crate::config::Settings;
use crate::error::SnapError;
use crate::image_ops::CroppedImage;
use crate::results::{ResultsView, UploadsView};
use crate::state::{ExitReason, FlowState};

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Observer installed on a flow tracker to show progress.
pub type FlowListener = Box<dyn Fn(&FlowState) + Send + Sync>;

/// Result of a completed `search` command.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub ok: bool,
    pub search_id: SearchId,
    /// Image the user picked.
    pub source: String,
    /// Cropped copy that was uploaded.
    pub uploaded: String,
    pub crop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsView>,
}

impl SearchReport {
    pub fn new(acquired: &AcquiredImage, search_id: SearchId, results: Option<ResultsView>) -> Self {
        Self {
            ok: true,
            search_id,
            source: acquired.source.to_string(),
            uploaded: acquired.image.to_string(),
            crop: acquired.region.to_string(),
            results,
        }
    }
}

/// Build metadata shown by `version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
    pub target: &'static str,
}

/// Structured error payload written to stderr in robot mode.
pub fn error_json(error: &SnapError) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "kind": error.kind(),
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON output for agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for people.
    Human { color: bool, quiet: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            let color = !cli.no_color && console::Term::stdout().features().colors_supported();
            Self::Human {
                color,
                quiet: cli.quiet,
            }
        }
    }

    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color, quiet } => Box::new(HumanOutput::new(color, quiet)),
        }
    }
}

/// Everything a command can print.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &SnapError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    /// Progress observer for a running flow, if this mode shows progress.
    fn flow_listener(&self) -> Option<FlowListener>;

    // Flow outcomes
    fn search_finished(&self, report: &SearchReport);
    fn acquisition_exit(&self, reason: ExitReason);
    fn cropped(&self, image: &CroppedImage);

    // Remote operations
    fn uploaded(&self, record: &UploadRecord);
    fn clipped(&self, record: &ClipRecord);
    fn results(&self, view: &ResultsView);
    fn history(&self, list: &SearchList);

    // Local history
    fn uploads(&self, view: &UploadsView);

    // Metadata
    fn settings(&self, settings: &Settings, source: Option<&Path>);
    fn config_path(&self, path: Option<&Path>);
    fn version_info(&self, info: &VersionInfo);
}
