//! Daemon command - scheduled syncs until a shutdown signal
//!
//! Holds the library lock for the whole lifetime of the daemon, runs one
//! sync per cron instant, and treats a delivered signal as a clean
//! shutdown (lock released, exit code 0).

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use frostpix_core::domain::failure::{self, Failure};
use frostpix_icloud::PhotosClient;
use frostpix_sync::engine::SyncEngine;
use frostpix_sync::library::FsLibrary;
use frostpix_sync::lock::LibraryLock;
use frostpix_sync::scheduler::{run_daemon, shutdown_signal, Scheduler};

use crate::commands::{load_config, ready_session, CommonOpts};
use crate::output::{ConsoleSyncObserver, OutputFormat};

#[derive(Debug, Args)]
pub struct DaemonCommand {
    /// Cron expression scheduling sync runs (overrides the config file)
    #[arg(long)]
    pub schedule: Option<String>,

    #[command(flatten)]
    pub common: CommonOpts,
}

impl DaemonCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path, &self.common);

        let expression = self
            .schedule
            .clone()
            .or_else(|| config.daemon.schedule.clone())
            .ok_or_else(|| {
                Failure::library("Daemon mode requires a schedule (--schedule or daemon.schedule)")
            })?;
        let scheduler = Scheduler::new(&expression)?;

        let mut lock = LibraryLock::acquire(&config.library.data_dir, config.library.force)?;

        let session = ready_session(&config, format).await?;
        let remote = Arc::new(PhotosClient::from_session(&session)?);
        let observer = Arc::new(ConsoleSyncObserver::new(format));
        let local =
            Arc::new(FsLibrary::new(&config.library.data_dir).with_observer(observer.clone()));
        let engine = SyncEngine::new(remote, local, session, &config).with_observer(observer);

        let cancel = engine.cancel_token();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Ok(signal) = shutdown_signal().await {
                warn!(signal, "Shutdown signal received");
                signal_cancel.cancel();
            }
        });

        let result = run_daemon(&scheduler, cancel, || engine.run()).await;
        lock.release();

        match result {
            Err(err) if failure::is_interrupt(&err) => {
                info!("Daemon shut down cleanly");
                Ok(())
            }
            other => other,
        }
    }
}
