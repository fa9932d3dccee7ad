//! Archive engine
//!
//! Freezes a local album so future syncs leave it untouched: every symlink
//! is replaced by a real copy of the asset bytes (the album becomes
//! self-contained), the `.archive` marker records the member fingerprints,
//! and optionally the non-favorite remote originals are deleted upstream.
//! Favorites are never deleted remotely.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use frostpix_core::domain::failure::Failure;
use frostpix_core::domain::newtypes::{Fingerprint, RecordName};
use frostpix_core::domain::LibrarySnapshot;
use frostpix_core::ports::observer::{ArchiveObserver, NullObserver};
use frostpix_core::ports::remote_library::RemoteLibrary;

use crate::library::{FsLibrary, ALBUM_MARKER, ARCHIVED_MARKER};

/// Freezes album subtrees in place.
pub struct ArchiveEngine {
    library: Arc<FsLibrary>,
    remote: Arc<dyn RemoteLibrary>,
    observer: Arc<dyn ArchiveObserver>,
    remote_delete: bool,
}

impl ArchiveEngine {
    /// Creates an archive engine over the given library and remote.
    pub fn new(
        library: Arc<FsLibrary>,
        remote: Arc<dyn RemoteLibrary>,
        remote_delete: bool,
    ) -> Self {
        Self {
            library,
            remote,
            observer: Arc::new(NullObserver),
            remote_delete,
        }
    }

    /// Plugs in a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ArchiveObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Archives the album at `path`.
    ///
    /// `remote` supplies record names and favorite flags for the optional
    /// remote deletion; pass an empty snapshot when remote deletion is off.
    ///
    /// Partial persistence is fatal (it leaves a mixed state); failures of
    /// the remote-delete step are reported but do not reverse the local
    /// archival.
    #[instrument(skip(self, remote), fields(path = %path.display()))]
    pub async fn archive_path(&self, path: &Path, remote: &LibrarySnapshot) -> Result<()> {
        let album_dir = self.resolve_album_dir(path).await?;

        // Collect the current membership from the symlinks.
        let links = self.collect_links(&album_dir).await?;
        if links.is_empty() {
            return Err(Failure::archive("Album has no members to archive")
                .with_context("dir", album_dir.display())
                .into());
        }
        let total = links.len();
        info!(members = total, "Archiving album");

        // Persist every member: replace the link with the actual bytes.
        // Any failure here is fatal; a half-persisted album must be
        // surfaced, not papered over.
        for (index, (link_path, target)) in links.iter().enumerate() {
            tokio::fs::remove_file(link_path).await.map_err(|e| {
                Failure::archive("Partial persistence: cannot remove album link")
                    .with_context("link", link_path.display())
                    .with_context("persisted", index)
                    .with_context("total", total)
                    .with_source(e)
            })?;
            tokio::fs::copy(target, link_path).await.map_err(|e| {
                Failure::archive("Partial persistence: cannot copy asset into album")
                    .with_context("target", link_path.display())
                    .with_context("persisted", index)
                    .with_context("total", total)
                    .with_source(e)
            })?;

            let fingerprint = fingerprint_of_target(target);
            if let Some(asset) = fingerprint.as_ref().and_then(|fp| remote.asset(fp)) {
                self.observer.on_member_persisted(asset, index + 1, total);
            }
            debug!(file = %link_path.display(), "Member persisted");
        }

        // Mark the album as archived; the marker records the member
        // fingerprints so the reference bookkeeping survives without the
        // symlinks.
        let fingerprints: Vec<Fingerprint> = links
            .iter()
            .filter_map(|(_, target)| fingerprint_of_target(target))
            .collect();
        let marker_body = fingerprints
            .iter()
            .map(Fingerprint::encode)
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(album_dir.join(ARCHIVED_MARKER), marker_body)
            .await
            .map_err(|e| Failure::archive("Cannot write archive marker").with_source(e))?;

        info!(dir = %album_dir.display(), members = total, "Album archived");

        if self.remote_delete {
            self.delete_remote_originals(&fingerprints, remote).await;
        }

        Ok(())
    }

    /// Validates and resolves the archive target directory.
    async fn resolve_album_dir(&self, path: &Path) -> Result<PathBuf> {
        let data_dir = tokio::fs::canonicalize(self.library.data_dir())
            .await
            .map_err(|e| Failure::archive("Cannot resolve data directory").with_source(e))?;
        let album_dir = tokio::fs::canonicalize(path).await.map_err(|e| {
            Failure::archive("Archive target does not exist")
                .with_context("path", path.display())
                .with_source(e)
        })?;

        if !album_dir.starts_with(&data_dir) {
            return Err(Failure::archive("Archive target is outside the library")
                .with_context("path", album_dir.display())
                .into());
        }
        let all_photos = tokio::fs::canonicalize(self.library.all_photos_dir())
            .await
            .unwrap_or_else(|_| self.library.all_photos_dir());
        if album_dir == data_dir || album_dir == all_photos {
            return Err(Failure::archive("Refusing to archive a reserved directory")
                .with_context("path", album_dir.display())
                .into());
        }
        if !tokio::fs::try_exists(album_dir.join(ALBUM_MARKER))
            .await
            .unwrap_or(false)
        {
            return Err(Failure::archive("Archive target is not an album")
                .with_context("path", album_dir.display())
                .into());
        }
        if tokio::fs::try_exists(album_dir.join(ARCHIVED_MARKER))
            .await
            .unwrap_or(false)
        {
            return Err(Failure::archive("Album is already archived")
                .with_context("path", album_dir.display())
                .into());
        }

        Ok(album_dir)
    }

    /// Collects `(link path, resolved target)` pairs for the album members.
    async fn collect_links(&self, album_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut links = Vec::new();
        let mut entries = tokio::fs::read_dir(album_dir)
            .await
            .map_err(|e| Failure::archive("Cannot read album directory").with_source(e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Failure::archive("Cannot iterate album directory").with_source(e))?
        {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_symlink() {
                continue;
            }
            let link_path = entry.path();
            match tokio::fs::canonicalize(&link_path).await {
                Ok(target) => links.push((link_path, target)),
                Err(e) => {
                    return Err(Failure::archive("Album link does not resolve")
                        .with_context("link", link_path.display())
                        .with_source(e)
                        .into());
                }
            }
        }

        Ok(links)
    }

    /// Step 5: delete the non-favorite remote originals. Failures are
    /// reported as warnings; the local archival stands either way.
    async fn delete_remote_originals(
        &self,
        fingerprints: &[Fingerprint],
        remote: &LibrarySnapshot,
    ) {
        let mut records: Vec<RecordName> = Vec::new();
        let mut seen: HashSet<RecordName> = HashSet::new();

        for fingerprint in fingerprints {
            let Some(asset) = remote.asset(fingerprint) else {
                self.observer.on_warning(
                    &Failure::archive("No remote record for archived member, skipping deletion")
                        .warning()
                        .with_context("fingerprint", fingerprint),
                );
                continue;
            };

            if asset.is_favorite() {
                // Favorites are never deleted remotely.
                self.observer.on_favorite_kept(asset);
                self.observer.on_warning(
                    &Failure::archive(format!(
                        "Favorite kept in the remote library: {}",
                        asset.original_name()
                    ))
                    .warning()
                    .with_context("record", asset.record_name()),
                );
                continue;
            }

            if seen.insert(asset.record_name().clone()) {
                records.push(asset.record_name().clone());
            }
        }

        if records.is_empty() {
            debug!("No remote originals to delete");
            return;
        }

        match self.remote.delete_assets(&records).await {
            Ok(()) => self.observer.on_remote_deleted(records.len()),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Remote deletion failed, archive stands");
                self.observer.on_warning(
                    &Failure::archive("Remote deletion failed; archived copies are safe")
                        .warning()
                        .with_context("records", records.len())
                        .with_source(err),
                );
            }
        }
    }
}

/// Recovers the fingerprint from a resolved `_All-Photos` target path.
fn fingerprint_of_target(target: &Path) -> Option<Fingerprint> {
    let name = target.file_name()?.to_string_lossy();
    let (stem, _) = name.split_once('.')?;
    Fingerprint::decode(stem).ok()
}
