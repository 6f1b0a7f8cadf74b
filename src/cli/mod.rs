//! CLI argument definitions.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::CropSettings;
use crate::error::SnapError;
use crate::image_ops::{CenteredSquare, CropRegion, CropStrategy, FixedRegion, FullImage};

/// snapped - find products that look like your photo.
///
/// Picks an image, crops it, uploads it to the image-search server, and
/// shows the matches. Robot Mode: use --robot or --format json for
/// machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "snapped", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "SNAPPED_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (default: <config dir>/snapped/config.toml)
    #[arg(long, global = true, env = "SNAPPED_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the image-search API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Search Flow ===
    /// Crop an image, upload it, search, and record it in the upload history
    Search(SearchArgs),

    /// Crop an image locally without uploading
    Crop(CropArgs),

    // === Remote API ===
    /// Upload an image as-is and print the server path
    Upload(UploadArgs),

    /// Clip an already-uploaded image on the server
    Clip(ClipArgs),

    /// Show the results of a search
    Results(ResultsArgs),

    /// List searches stored on the server
    History(HistoryArgs),

    // === Local History ===
    /// List recorded uploads, newest first
    Uploads(UploadsArgs),

    // === Utilities ===
    /// Show the effective configuration
    Config(ConfigArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where to crop before uploading.
///
/// Accepts `center`, `none`, or `X,Y,WIDTH,HEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropPolicy {
    /// Centered square sized from the configured viewport.
    #[default]
    Center,
    /// Keep the whole image.
    None,
    /// Explicit pixel rectangle.
    Region(CropRegion),
}

impl FromStr for CropPolicy {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Self::Center),
            "none" | "full" => Ok(Self::None),
            _ => s.parse::<CropRegion>().map(Self::Region),
        }
    }
}

impl CropPolicy {
    /// Strategy implementing this policy.
    pub fn strategy(&self, settings: &CropSettings) -> Box<dyn CropStrategy> {
        match self {
            Self::Center => Box::new(CenteredSquare::from(settings)),
            Self::None => Box::new(FullImage),
            Self::Region(region) => Box::new(FixedRegion(*region)),
        }
    }
}

// === Argument Structs ===

/// Arguments for the full search flow.
///
/// # Examples
///
/// ```bash
/// # Search with the newest screenshot in a directory
/// snapped search ~/Pictures/Screenshots/
///
/// # Search a specific region of a photo
/// snapped search shoe.jpg --crop 120,80,600,600
/// ```
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Image file, or a directory to take the newest image from
    #[arg(value_name = "IMAGE|DIR")]
    pub source: PathBuf,

    /// Crop policy: center, none, or X,Y,WIDTH,HEIGHT
    #[arg(long, short = 'c', default_value = "center")]
    pub crop: CropPolicy,

    /// Record the search but do not fetch and print its results
    #[arg(long)]
    pub no_results: bool,
}

#[derive(Parser, Debug)]
pub struct CropArgs {
    /// Image to crop
    pub image: PathBuf,

    /// Crop policy: center, none, or X,Y,WIDTH,HEIGHT
    #[arg(long, short = 'c', default_value = "center")]
    pub crop: CropPolicy,

    /// Output file (default: a new file in the crops directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Image to upload
    pub image: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ClipArgs {
    /// Server path returned by a previous upload
    #[arg(value_name = "SERVER_PATH")]
    pub image_path: String,

    #[arg(long)]
    pub x: u32,

    #[arg(long)]
    pub y: u32,

    #[arg(long)]
    pub width: u32,

    #[arg(long)]
    pub height: u32,

    /// Cloud public id of the uploaded image
    #[arg(long)]
    pub public_id: Option<String>,

    /// Search the clipped image right away
    #[arg(long)]
    pub search: bool,
}

#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Search id
    #[arg(required_unless_present = "latest", conflicts_with = "latest")]
    pub id: Option<i64>,

    /// Use the newest recorded upload
    #[arg(long)]
    pub latest: bool,
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Maximum number of searches (default: from config)
    #[arg(long, short = 'n')]
    pub limit: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct UploadsArgs {
    /// Maximum number of rows
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
