//! Structured logging initialization for the snapped CLI.
//!
//! Logs always go to stderr so stdout stays clean for results and robot-mode
//! JSON.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default filter directive for the given verbosity.
///
/// * `verbose` - 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - only errors, wins over `verbose`
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "snapped=error";
    }
    match verbose {
        0 => "snapped=info",
        1 => "snapped=debug",
        _ => "snapped=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// `RUST_LOG` overrides the default directive (e.g. `snapped=debug,reqwest=info`).
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | Robot | any | JSON lines to stderr |
/// | Human | yes | Colored lines to stderr |
/// | Human | no | Compact plain lines to stderr |
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);

    let _ = if robot_mode {
        registry.with(layer.json().with_target(true)).try_init()
    } else if io::stderr().is_terminal() {
        registry.with(layer.with_target(false)).try_init()
    } else {
        registry
            .with(layer.with_ansi(false).with_target(false).compact())
            .try_init()
    };
}
