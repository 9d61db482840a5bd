//! Keepsake - session state server
//!
//! Main entry point for the Keepsake CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keepsake - session state server
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also write JSON logs to daily files in this directory
    #[arg(long, global = true, env = "KEEPSAKE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true, env = "KEEPSAKE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the session server
    Serve(serve::ServeArgs),

    /// Validate the config file and print the effective settings
    CheckConfig(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "keepsake=debug,keepsake_server=debug,keepsake_session=debug,tower_http=debug,info"
    } else {
        "keepsake=info,keepsake_server=info,keepsake_session=info,warn"
    };
    let _guard = init_tracing(default_filter, cli.log_json, cli.log_dir.as_deref());

    let ctx = commands::Context {
        config_path: cli.config,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::CheckConfig(args) => check::run(args, &ctx),
    }
}

/// Console logging, plus rolling JSON files when `log_dir` is set.
///
/// `RUST_LOG` overrides `default_filter` for the console layer.
fn init_tracing(
    default_filter: &str,
    json: bool,
    log_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(console_filter)
            .boxed()
    };

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "keepsake.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(
                    "keepsake=trace,keepsake_server=trace,keepsake_session=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}
