//! lapse - screen-capture delay/diff visualizer
//!
//! Shows the live screen, a copy delayed by N frames and their difference.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod session;

use session::SessionArgs;

#[derive(Parser, Debug)]
#[command(name = "lapse")]
#[command(author, version, about = "Screen-capture delay/diff visualizer")]
#[command(long_about = "
Captures the screen through ffmpeg and shows three panels: the live
capture, the capture delayed by N frames, and their difference.

Examples:
  lapse view                            # Capture 1920x1080, delay 30 frames
  lapse view --area 1280x720+0+0 -d 10  # Smaller area, shorter delay
  lapse view --synthetic                # Test pattern, no ffmpeg needed
  lapse headless --synthetic -n 200     # Time 200 frames without a window
  lapse headless -n 5 --dump out/       # Write every panel as PNG
  lapse info --config session.yaml      # Print the sampling graph
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of sampling threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the live window
    #[cfg(feature = "viewer")]
    #[command(visible_alias = "v")]
    View(ViewArgs),

    /// Run frames without a window and report timing
    #[command(visible_alias = "run")]
    Headless(HeadlessArgs),

    /// Print the resolved session and sampling graph
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[cfg(feature = "viewer")]
#[derive(Args, Debug)]
struct ViewArgs {
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args, Debug)]
struct HeadlessArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Frames to run
    #[arg(short = 'n', long, default_value = "100")]
    frames: u64,

    /// Directory for PNG snapshots of every panel
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Dump every Nth frame
    #[arg(long, default_value = "1")]
    dump_every: u64,
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    session: SessionArgs,
}

/// Installs the global subscriber. Keep the guard alive to flush the log file.
fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let name = path.file_name().context("--log-file needs a file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_ref())?;

    match cli.command {
        #[cfg(feature = "viewer")]
        Commands::View(args) => commands::view::run(args, cli.threads),
        Commands::Headless(args) => commands::headless::run(args, cli.threads, cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.threads),
    }
}
