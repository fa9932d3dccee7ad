//! frostpix CLI - one-way iCloud Photos backup
//!
//! Provides commands for:
//! - Running a single sync (`sync`)
//! - Obtaining and printing a trust token (`token`)
//! - Freezing a local album (`archive`)
//! - Running scheduled syncs (`daemon`)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::archive::ArchiveCommand;
use commands::daemon::DaemonCommand;
use commands::sync::SyncCommand;
use commands::token::TokenCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "frostpix", version, about = "One-way iCloud Photos backup for Linux")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the local mirror with the remote library
    Sync(SyncCommand),
    /// Authenticate and print the trust token
    Token(TokenCommand),
    /// Freeze a local album so future syncs leave it untouched
    Archive(ArchiveCommand),
    /// Run scheduled syncs until a shutdown signal arrives
    Daemon(DaemonCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, config_path).await,
        Commands::Token(cmd) => cmd.execute(format, config_path).await,
        Commands::Archive(cmd) => cmd.execute(format, config_path).await,
        Commands::Daemon(cmd) => cmd.execute(format, config_path).await,
    }
}
