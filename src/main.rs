//! snapped - image search from the command line.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use snapped::acquire::{Acquisition, AcquisitionFlow, PathSource};
use snapped::api::{ClipParams, HttpSearchClient, LocalImageRef, SearchApi, SearchParams};
use snapped::cli::{self, Cli, Commands};
use snapped::config::{Settings, default_config_path, expand_home, validate_image_path};
use snapped::error::{Result, SnapError};
use snapped::image_ops::crop_to_file;
use snapped::ledger::{Ledger, SqliteStore};
use snapped::logging::init_logging;
use snapped::output::{Output, OutputMode, SearchReport, VersionInfo};
use snapped::pipeline::Pipeline;
use snapped::results::{ResultsView, UploadsView, latest_search_id, load_results};
use snapped::state::{ExitReason, FlowTracker};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

/// Per-invocation state shared by commands.
struct App<'a> {
    settings: Settings,
    config_source: Option<PathBuf>,
    output: &'a dyn Output,
}

impl App<'_> {
    fn api(&self) -> Result<HttpSearchClient> {
        HttpSearchClient::new(&self.settings.api)
    }

    fn ledger(&self) -> Result<Ledger> {
        let store = SqliteStore::open(self.settings.ledger_db_path()?)?;
        Ledger::spawn_with_capacity(store, self.settings.storage.ledger_capacity)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    // Handle no-color flag or non-TTY
    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
    }

    let output = OutputMode::from_cli(&cli).into_output();
    if let Err(e) = run(&cli, output.as_ref()).await {
        output.error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, output: &dyn Output) -> Result<()> {
    // Commands that need no configuration.
    match &cli.command {
        None => return print_quick_start(cli),
        Some(Commands::Version) => {
            cmd_version(output);
            return Ok(());
        }
        Some(Commands::Completions(args)) => return cmd_completions(args),
        Some(_) => {}
    }

    let app = load_app(cli, output)?;
    match &cli.command {
        Some(Commands::Search(args)) => cmd_search(&app, args).await,
        Some(Commands::Crop(args)) => cmd_crop(&app, args),
        Some(Commands::Upload(args)) => cmd_upload(&app, args).await,
        Some(Commands::Clip(args)) => cmd_clip(&app, args).await,
        Some(Commands::Results(args)) => cmd_results(&app, args).await,
        Some(Commands::History(args)) => cmd_history(&app, args).await,
        Some(Commands::Uploads(args)) => cmd_uploads(&app, args).await,
        Some(Commands::Config(args)) => {
            cmd_config(cli, &app, args);
            Ok(())
        }
        None | Some(Commands::Version | Commands::Completions(_)) => Ok(()),
    }
}

/// Settings from file, then environment, then flags.
fn load_app<'a>(cli: &Cli, output: &'a dyn Output) -> Result<App<'a>> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env();
    if let Some(url) = &cli.api_url {
        settings.api.base_url.clone_from(url);
    }

    let config_source = match &cli.config {
        Some(p) => Some(expand_home(p)?),
        None => default_config_path().filter(|p| p.exists()),
    };
    debug!(api = %settings.api.base_url, ?config_source, "Settings resolved");

    Ok(App {
        settings,
        config_source,
        output,
    })
}

// === Quick Start (Robot Mode Optimized) ===

/// Prints quick-start help optimized for both humans and AI agents.
#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        print_robot_quick_start();
    } else {
        print_human_quick_start();
    }
    Ok(())
}

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    flow: RobotFlow,
    remote: RobotRemote,
    local: RobotLocal,
    crop_policies: [&'static str; 3],
    output_modes: OutputModes,
    server: &'static str,
}

#[derive(Serialize)]
struct RobotFlow {
    search_file: &'static str,
    search_newest_in_dir: &'static str,
    search_region: &'static str,
    crop_only: &'static str,
}

#[derive(Serialize)]
struct RobotRemote {
    upload: &'static str,
    clip: &'static str,
    results: &'static str,
    history: &'static str,
}

#[derive(Serialize)]
struct RobotLocal {
    uploads: &'static str,
    latest_results: &'static str,
}

#[derive(Serialize)]
struct OutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

fn print_robot_quick_start() {
    let help = RobotQuickStart {
        tool: "snapped",
        version: build_info::VERSION,
        description: "Image search client: crop, upload, search, and keep an upload history",
        flow: RobotFlow {
            search_file: "snapped search <IMAGE> --robot",
            search_newest_in_dir: "snapped search <DIR> --robot",
            search_region: "snapped search <IMAGE> --crop X,Y,W,H --robot",
            crop_only: "snapped crop <IMAGE> --out <PATH>",
        },
        remote: RobotRemote {
            upload: "snapped upload <IMAGE>",
            clip: "snapped clip <SERVER_PATH> --x X --y Y --width W --height H [--search]",
            results: "snapped results <SEARCH_ID>",
            history: "snapped history --limit 50",
        },
        local: RobotLocal {
            uploads: "snapped uploads",
            latest_results: "snapped results --latest",
        },
        crop_policies: ["center", "none", "X,Y,WIDTH,HEIGHT"],
        output_modes: OutputModes {
            human: "--format=text (default)",
            robot: "--robot or --format=json",
            compact: "--format=json-compact",
        },
        server: "--api-url <URL> or SNAPPED_API_BASE_URL",
    };

    match serde_json::to_string_pretty(&help) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{e}"),
    }
}

fn print_human_quick_start() {
    println!(
        "{} {} - image search from the command line\n",
        style("snapped").bold().cyan(),
        build_info::VERSION
    );

    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Search with a photo", style("snapped search shoe.jpg").green());
    println!(
        "  {}  Newest image in a folder",
        style("snapped search ~/Pictures/").green()
    );
    println!(
        "  {}  Search a region",
        style("snapped search shoe.jpg --crop 0,0,400,400").green()
    );
    println!("  {}  My uploads", style("snapped uploads").green());
    println!("  {}  Latest results", style("snapped results --latest").green());
    println!();

    println!("{}", style("ROBOT MODE (for AI agents)").bold().underlined());
    println!();
    println!("  {}  JSON output", style("snapped --robot <command>").cyan());
    println!("  {}  Quick-start JSON", style("snapped --robot").cyan());
    println!();

    println!("Run {} for full help", style("snapped --help").yellow());
}

// === Search Flow ===

async fn cmd_search(app: &App<'_>, args: &cli::SearchArgs) -> Result<()> {
    let settings = &app.settings;
    let source = PathSource::new(expand_home(&args.source)?);
    let strategy = args.crop.strategy(&settings.crop);

    // Open both ends first so a bad database or client config fails before
    // anything is written to the crops directory.
    let api = app.api()?;
    let ledger = app.ledger()?;

    let mut tracker = match app.output.flow_listener() {
        Some(listener) => FlowTracker::new().with_listener(listener),
        None => FlowTracker::new(),
    };

    let acquisition = AcquisitionFlow::new(&source, strategy.as_ref(), settings.crops_dir()?)
        .with_jpeg_quality(settings.crop.jpeg_quality)
        .acquire(&mut tracker)?;

    let acquired = match acquisition {
        Acquisition::Ready(acquired) => acquired,
        Acquisition::PermissionDenied => {
            app.output.acquisition_exit(ExitReason::PermissionDenied);
            return Ok(());
        }
        Acquisition::Cancelled => {
            app.output.acquisition_exit(ExitReason::Cancelled);
            return Ok(());
        }
    };

    let outcome = Pipeline::new(&api, &ledger)
        .run(&acquired.image, &mut tracker)
        .await;
    if !outcome.is_success() {
        // No ledger entry points at the crop, so nothing would ever read it.
        acquired.discard();
    }
    let handle = outcome.into_result()?;

    let results = if args.no_results {
        None
    } else {
        Some(load_results(&api, handle.search_id).await?)
    };
    app.output
        .search_finished(&SearchReport::new(&acquired, handle.search_id, results));
    Ok(())
}

fn cmd_crop(app: &App<'_>, args: &cli::CropArgs) -> Result<()> {
    let settings = &app.settings;
    let strategy = args.crop.strategy(&settings.crop);
    let dest = match &args.out {
        Some(out) => expand_home(out)?,
        None => settings
            .crops_dir()?
            .join(format!("crop-{}.jpg", Uuid::new_v4())),
    };

    let cropped = crop_to_file(
        &expand_home(&args.image)?,
        &dest,
        strategy.as_ref(),
        settings.crop.jpeg_quality,
    )?;
    info!(path = %cropped.path.display(), "Crop written");
    app.output.cropped(&cropped);
    Ok(())
}

// === Remote API ===

async fn cmd_upload(app: &App<'_>, args: &cli::UploadArgs) -> Result<()> {
    let path = expand_home(&args.image)?;
    validate_image_path(&path)?;
    let record = app.api()?.upload(&LocalImageRef::from(path)).await?;
    app.output.uploaded(&record);
    Ok(())
}

async fn cmd_clip(app: &App<'_>, args: &cli::ClipArgs) -> Result<()> {
    if args.width == 0 || args.height == 0 {
        return Err(SnapError::InvalidCropRegion(
            "width and height must be positive".to_string(),
        ));
    }
    let api = app.api()?;
    let record = api
        .clip(&ClipParams {
            image_path: args.image_path.clone(),
            x: args.x,
            y: args.y,
            width: args.width,
            height: args.height,
            cloudinary_public_id: args.public_id.clone(),
        })
        .await?;

    if !args.search {
        app.output.clipped(&record);
        return Ok(());
    }

    let response = api.search(&SearchParams::from_clip(&record)).await?;
    app.output.results(&ResultsView::from_response(&response));
    Ok(())
}

async fn cmd_results(app: &App<'_>, args: &cli::ResultsArgs) -> Result<()> {
    let search_id = match args.id {
        Some(id) => id,
        None => latest_search_id(&app.ledger()?).await?,
    };
    let view = load_results(&app.api()?, search_id).await?;
    app.output.results(&view);
    Ok(())
}

async fn cmd_history(app: &App<'_>, args: &cli::HistoryArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(app.settings.history.limit);
    let list = app.api()?.list_searches(limit).await?;
    app.output.history(&list);
    Ok(())
}

// === Local History ===

async fn cmd_uploads(app: &App<'_>, args: &cli::UploadsArgs) -> Result<()> {
    let entries = app.ledger()?.list_all().await?;
    let view = UploadsView::from_entries(&entries, args.limit.unwrap_or(usize::MAX));
    app.output.uploads(&view);
    Ok(())
}

// === Utilities ===

fn cmd_config(cli: &Cli, app: &App<'_>, args: &cli::ConfigArgs) {
    if args.path {
        let path = cli.config.clone().or_else(default_config_path);
        app.output.config_path(path.as_deref());
    } else {
        app.output
            .settings(&app.settings, app.config_source.as_deref());
    }
}

fn cmd_version(output: &dyn Output) {
    output.version_info(&VersionInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty() == "true",
        build_timestamp: build_info::build_timestamp(),
        rustc_version: build_info::rustc_semver(),
        target: build_info::target(),
    });
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "snapped", &mut io::stdout());
    Ok(())
}
