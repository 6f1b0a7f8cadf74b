//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, instrument, trace};

use crate::api::{ClipRecord, SearchList, UploadRecord};
use crate::config::Settings;
use crate::error::SnapError;
use crate::image_ops::CroppedImage;
use crate::results::{ResultsView, UploadsView};
use crate::state::ExitReason;

use super::{FlowListener, Output, RobotFormat, SearchReport, VersionInfo, error_json};

/// JSON output for agents and scripting. Data goes to stdout, errors to
/// stderr.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> String {
        let rendered = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        rendered.unwrap_or_else(|e| {
            error!(error = %e, "JSON serialization failed");
            r#"{"error":true,"message":"serialization failed"}"#.to_string()
        })
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = self.render(data);
        trace!(json_len = json.len(), "JSON serialized");
        println!("{json}");
    }
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&serde_json::json!({ "success": true, "message": message }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &SnapError) {
        debug!(error = %error, "Robot: error");
        eprintln!("{}", self.render(&error_json(error)));
    }

    fn warning(&self, message: &str) {
        self.output_json(&serde_json::json!({ "warning": true, "message": message }));
    }

    fn info(&self, message: &str) {
        self.output_json(&serde_json::json!({ "info": true, "message": message }));
    }

    fn flow_listener(&self) -> Option<FlowListener> {
        None
    }

    #[instrument(skip(self, report), fields(search_id = report.search_id))]
    fn search_finished(&self, report: &SearchReport) {
        self.output_json(report);
    }

    fn acquisition_exit(&self, reason: ExitReason) {
        self.output_json(&serde_json::json!({ "ok": false, "exit": reason }));
    }

    fn cropped(&self, image: &CroppedImage) {
        self.output_json(image);
    }

    fn uploaded(&self, record: &UploadRecord) {
        self.output_json(record);
    }

    fn clipped(&self, record: &ClipRecord) {
        self.output_json(record);
    }

    #[instrument(skip(self, view), fields(search_id = view.search_id))]
    fn results(&self, view: &ResultsView) {
        self.output_json(view);
    }

    fn history(&self, list: &SearchList) {
        self.output_json(list);
    }

    fn uploads(&self, view: &UploadsView) {
        self.output_json(view);
    }

    fn settings(&self, settings: &Settings, source: Option<&Path>) {
        self.output_json(&serde_json::json!({
            "source": source.map(|p| p.display().to_string()),
            "settings": settings,
        }));
    }

    fn config_path(&self, path: Option<&Path>) {
        self.output_json(&serde_json::json!({
            "path": path.map(|p| p.display().to_string()),
            "exists": path.is_some_and(Path::exists),
        }));
    }

    fn version_info(&self, info: &VersionInfo) {
        self.output_json(info);
    }
}
