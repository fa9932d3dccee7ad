//! Sync command - one differential sync pass
//!
//! 1. Loads configuration and acquires the library lock
//! 2. Drives the auth session to ready (MFA handshake if needed)
//! 3. Runs the sync engine with console progress
//! 4. Translates SIGINT/SIGTERM into engine cancellation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::warn;

use frostpix_icloud::PhotosClient;
use frostpix_sync::engine::SyncEngine;
use frostpix_sync::library::FsLibrary;
use frostpix_sync::lock::LibraryLock;
use frostpix_sync::scheduler::shutdown_signal;

use crate::commands::{load_config, ready_session, CommonOpts};
use crate::output::{self, ConsoleSyncObserver, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    pub common: CommonOpts,

    /// Pipeline restarts allowed on recoverable failure
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Concurrent asset downloads
    #[arg(long)]
    pub download_threads: Option<usize>,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
        let mut config = load_config(config_path, &self.common);
        if let Some(retries) = self.max_retries {
            config.sync.max_retries = retries;
        }
        if let Some(threads) = self.download_threads {
            config.sync.download_threads = threads;
        }

        let _lock = LibraryLock::acquire(&config.library.data_dir, config.library.force)?;

        let session = ready_session(&config, format).await?;
        let remote = Arc::new(PhotosClient::from_session(&session)?);
        let observer = Arc::new(ConsoleSyncObserver::new(format));
        let local =
            Arc::new(FsLibrary::new(&config.library.data_dir).with_observer(observer.clone()));

        let engine = SyncEngine::new(remote, local, session, &config).with_observer(observer);

        // Signals cancel the engine at its next suspension point; the lock
        // is released when this function unwinds.
        let cancel = engine.cancel_token();
        tokio::spawn(async move {
            if let Ok(signal) = shutdown_signal().await {
                warn!(signal, "Shutdown signal received, cancelling sync");
                cancel.cancel();
            }
        });

        let totals = engine.run().await?;
        output::print_totals(format, &totals);
        Ok(())
    }
}
