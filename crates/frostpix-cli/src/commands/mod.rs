//! CLI subcommands
//!
//! Each command is a clap `Args` struct exposing `execute(format, config)`.
//! The shared prelude loads the config file, overlays environment
//! credentials, scrubs them from the process environment, and applies the
//! common CLI overrides.

pub mod archive;
pub mod daemon;
pub mod sync;
pub mod token;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use frostpix_core::config::Config;
use frostpix_icloud::IcloudSession;

use crate::output::{ConsoleAuthObserver, OutputFormat};

/// Overrides shared by every subcommand.
#[derive(Debug, Args)]
pub struct CommonOpts {
    /// Target filesystem root of the mirror
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// MFA endpoint port
    #[arg(long)]
    pub port: Option<u16>,

    /// Take over a stale library lock
    #[arg(long)]
    pub force: bool,
}

/// Loads the effective configuration: file, then environment overlay, then
/// CLI overrides. Credential environment variables are scrubbed in place
/// before anything else can observe or report them.
pub fn load_config(config_path: Option<&Path>, common: &CommonOpts) -> Config {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path);
    info!(config = %path.display(), "Configuration loaded");

    config.apply_env_overlay();
    Config::scrub_env();

    if let Some(data_dir) = &common.data_dir {
        config.library.data_dir = data_dir.clone();
    }
    if let Some(port) = common.port {
        config.mfa.port = port;
    }
    if common.force {
        config.library.force = true;
    }

    config
}

/// Builds a session and drives it to `Ready`, rendering auth progress.
pub async fn ready_session(config: &Config, format: OutputFormat) -> Result<Arc<IcloudSession>> {
    let session = Arc::new(IcloudSession::new(config)?);
    let observer = ConsoleAuthObserver::new(format);
    session.authenticate(&observer).await?;
    Ok(session)
}
