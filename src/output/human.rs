//! Human-friendly output using `console` styling and an `indicatif` spinner.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, instrument, trace};

use crate::api::{ClipRecord, SearchList, UploadRecord};
use crate::config::Settings;
use crate::error::SnapError;
use crate::image_ops::CroppedImage;
use crate::results::{ResultsView, UploadsView};
use crate::state::ExitReason;
use crate::theme::SnapTheme;

use super::{FlowListener, Output, SearchReport, VersionInfo};

/// Styled terminal output for people.
pub struct HumanOutput {
    theme: SnapTheme,
    quiet: bool,
}

impl HumanOutput {
    pub fn new(color: bool, quiet: bool) -> Self {
        debug!(color, quiet, "Creating HumanOutput");
        let theme = if color {
            SnapTheme::default()
        } else {
            SnapTheme::plain()
        };
        Self { theme, quiet }
    }

    fn label(&self, name: &str) -> String {
        self.theme.label.apply_to(format!("  {name:<10}")).to_string()
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        println!("{}{}", self.label(name), self.theme.value.apply_to(value));
    }

    fn spinner() -> ProgressBar {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner().with_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {message}", self.theme.success.apply_to("[OK]"));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &SnapError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        eprintln!("{}: {error}", self.theme.error.apply_to("Error"));
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {suggestion}", self.theme.warning.apply_to("Hint"));
        }
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {message}", self.theme.warning.apply_to("[WARN]"));
    }

    fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {message}", self.theme.accent.apply_to("[INFO]"));
    }

    fn flow_listener(&self) -> Option<FlowListener> {
        if self.quiet || !console::Term::stderr().is_term() {
            return None;
        }
        let bar = Self::spinner();
        Some(Box::new(move |state| {
            trace!(?state, "Spinner update");
            if state.is_terminal() {
                bar.finish_and_clear();
            } else {
                bar.set_message(state.status_text());
            }
        }))
    }

    fn search_finished(&self, report: &SearchReport) {
        if let Some(view) = &report.results {
            self.results(view);
        } else {
            self.success(&format!(
                "Search {} recorded",
                self.theme.search_id.apply_to(report.search_id)
            ));
        }
        if !self.quiet {
            println!(
                "{}",
                self.theme.muted.apply_to(format!(
                    "  {} cropped to {} as {}",
                    report.source, report.crop, report.uploaded
                ))
            );
        }
    }

    fn acquisition_exit(&self, reason: ExitReason) {
        match reason {
            ExitReason::PermissionDenied => {
                self.warning("Permission denied: cannot read images from that location");
            }
            ExitReason::Cancelled => self.info("No image selected"),
        }
    }

    fn cropped(&self, image: &CroppedImage) {
        self.success(&format!("Cropped to {}", image.path.display()));
        if !self.quiet {
            self.field(
                "Source",
                format!("{}x{}", image.source_width, image.source_height),
            );
            self.field("Region", image.region);
        }
    }

    fn uploaded(&self, record: &UploadRecord) {
        self.success(&record.message);
        self.field("Path", &record.image_path);
        if let Some(url) = &record.cloudinary_url {
            self.field("URL", self.theme.link.apply_to(url));
        }
    }

    fn clipped(&self, record: &ClipRecord) {
        self.success(&record.message);
        self.field("Path", &record.image_path);
        self.field("Original", &record.original_image_path);
    }

    #[instrument(skip(self, view), fields(search_id = view.search_id, count = view.count))]
    fn results(&self, view: &ResultsView) {
        println!(
            "{} {}",
            self.theme.header.apply_to(&view.count_label),
            self.theme
                .muted
                .apply_to(format!("(search {})", view.search_id))
        );
        if let Some(header) = &view.header_image {
            println!("  {}", self.theme.link.apply_to(header));
        }
        println!();
        for (idx, item) in view.items.iter().enumerate() {
            println!(
                "{} {}",
                self.theme.muted.apply_to(format!("{:>3}.", idx + 1)),
                self.theme.title.apply_to(&item.title)
            );
            let mut meta = Vec::new();
            if let Some(price) = &item.price {
                meta.push(self.theme.price.apply_to(price).to_string());
            }
            if let Some(brand) = &item.brand {
                meta.push(self.theme.muted.apply_to(brand).to_string());
            }
            if !meta.is_empty() {
                println!("     {}", meta.join("  "));
            }
            if let Some(link) = &item.link {
                println!("     {}", self.theme.link.apply_to(link));
            }
        }
    }

    fn history(&self, list: &SearchList) {
        if list.searches.is_empty() {
            self.info("No searches on the server yet");
            return;
        }
        println!(
            "{}",
            self.theme
                .header
                .apply_to(format!("Searches ({} total)", list.total))
        );
        for s in &list.searches {
            let clipped = if s.is_clipped { " [clip]" } else { "" };
            println!(
                "  {}  {}  {}{clipped}",
                self.theme.search_id.apply_to(format!("{:>6}", s.id)),
                self.theme.muted.apply_to(&s.search_time),
                s.image_path
            );
        }
    }

    fn uploads(&self, view: &UploadsView) {
        println!("{}", self.theme.header.apply_to("My Uploads"));
        if view.rows.is_empty() {
            println!("  {}", self.theme.muted.apply_to("No uploads yet"));
            return;
        }
        for row in &view.rows {
            let id = row
                .search_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            println!(
                "  {}  {}  {}",
                self.theme.muted.apply_to(&row.date),
                self.theme.search_id.apply_to(format!("{id:>6}")),
                row.uri
            );
        }
        if view.total > view.rows.len() {
            println!(
                "  {}",
                self.theme
                    .muted
                    .apply_to(format!("... {} more", view.total - view.rows.len()))
            );
        }
        if let Some(id) = view.latest_search_id {
            println!();
            println!("View results: snapped results {id}");
        }
    }

    fn settings(&self, settings: &Settings, source: Option<&Path>) {
        let source = source.map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());
        println!("{}", self.theme.header.apply_to("Configuration"));
        self.field("File", source);
        self.field("API", &settings.api.base_url);
        self.field("Timeout", format!("{}s", settings.api.timeout_secs));
        self.field(
            "Data dir",
            settings
                .data_dir()
                .map_or_else(|e| format!("<{e}>"), |p| p.display().to_string()),
        );
        self.field("Capacity", settings.storage.ledger_capacity);
        self.field("JPEG", settings.crop.jpeg_quality);
    }

    fn config_path(&self, path: Option<&Path>) {
        match path {
            Some(p) => println!("{}", p.display()),
            None => self.warning("No configuration directory on this platform"),
        }
    }

    fn version_info(&self, info: &VersionInfo) {
        println!("snapped {}", info.version);
        let dirty = if info.git_dirty { " (dirty)" } else { "" };
        println!("git: {}{dirty}", info.git_sha);
        println!("built: {}", info.build_timestamp);
        println!("rustc: {}", info.rustc_version);
        println!("target: {}", info.target);
    }
}
