//! Satchel - in-memory session store with idle expiry
//!
//! Main entry point for the satchel CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;

use satchel_config::LoggingSection;

mod commands;

use commands::{config, soak};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Satchel - in-memory session store with idle expiry
#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir + /satchel)
    #[arg(long, global = true, env = "SATCHEL_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a concurrent workload against an in-memory store
    Soak(soak::SoakArgs),

    /// Configuration inspection
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global subscriber.
///
/// Console logs go to stderr so `--json` output on stdout stays parseable.
/// With `file_dir` set, a daily rotating JSON file is written as well; the
/// returned guard must be held until exit to flush it.
fn init_logging(logging: &LoggingSection, verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = format!("satchel={level},satchel_session={level},satchel_config={level},warn");

    let console_json = logging.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new(&filter))
    });
    let console_text = (!logging.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new(&filter))
    });

    let (file_layer, guard) = match &logging.file_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "satchel.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "satchel=trace,satchel_session=trace,satchel_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .init();

    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = satchel_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let merged = loaded.config.clone();

    let _guard = init_logging(&merged.logging_or_default(), cli.verbose);

    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let ctx = commands::Context {
        loaded,
        config: merged,
        config_dir: cli.config_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Soak(args) => soak::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
