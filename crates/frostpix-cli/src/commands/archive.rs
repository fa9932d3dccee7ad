//! Archive command - freeze a local album
//!
//! Persists the album's members into the directory, writes the archive
//! marker, and (with `--remote-delete`) removes the non-favorite originals
//! from the remote library. Without remote deletion no authentication is
//! needed; the operation is purely local.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use frostpix_core::domain::newtypes::RecordName;
use frostpix_core::domain::{Asset, Failure, LibrarySnapshot};
use frostpix_core::ports::remote_library::RemoteLibrary;
use frostpix_icloud::PhotosClient;
use frostpix_sync::archive::ArchiveEngine;
use frostpix_sync::library::FsLibrary;
use frostpix_sync::lock::LibraryLock;

use crate::commands::{load_config, ready_session, CommonOpts};
use crate::output::{ConsoleArchiveObserver, OutputFormat};

#[derive(Debug, Args)]
pub struct ArchiveCommand {
    /// Local album directory to archive
    pub path: PathBuf,

    /// Delete the non-favorite remote originals after archiving
    #[arg(long)]
    pub remote_delete: bool,

    #[command(flatten)]
    pub common: CommonOpts,
}

/// Remote stand-in for local-only archival; nothing may reach it.
struct OfflineRemote;

#[async_trait::async_trait]
impl RemoteLibrary for OfflineRemote {
    async fn fetch_all(&self) -> Result<LibrarySnapshot> {
        Ok(LibrarySnapshot::new())
    }

    async fn download_asset(&self, _asset: &Asset, _dest: &Path) -> Result<()> {
        Err(Failure::archive("Local-only archival cannot download").into())
    }

    async fn delete_assets(&self, _records: &[RecordName]) -> Result<()> {
        Err(Failure::archive("Local-only archival cannot delete remotely").into())
    }
}

impl ArchiveCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
        let mut config = load_config(config_path, &self.common);
        if self.remote_delete {
            config.archive.remote_delete = true;
        }

        let _lock = LibraryLock::acquire(&config.library.data_dir, config.library.force)?;

        let library = Arc::new(FsLibrary::new(&config.library.data_dir));
        let observer = Arc::new(ConsoleArchiveObserver::new(format));

        // The remote snapshot supplies record names and favorite flags for
        // deletion; without --remote-delete the whole operation is offline.
        let (remote, remote_snapshot) = if config.archive.remote_delete {
            let session = ready_session(&config, format).await?;
            let client: Arc<dyn RemoteLibrary> = Arc::new(PhotosClient::from_session(&session)?);
            let snapshot = client.fetch_all().await?;
            (client, snapshot)
        } else {
            let offline: Arc<dyn RemoteLibrary> = Arc::new(OfflineRemote);
            (offline, LibrarySnapshot::new())
        };

        let engine = ArchiveEngine::new(library, remote, config.archive.remote_delete)
            .with_observer(observer);
        engine.archive_path(&self.path, &remote_snapshot).await
    }
}
