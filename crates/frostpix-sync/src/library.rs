//! On-disk library (filesystem-as-state)
//!
//! The tree under the data directory is the sole source of truth about
//! local state; there is no side database, so everything must be
//! recoverable from the filesystem alone after any crash.
//!
//! ## Layout
//!
//! ```text
//! <data-dir>/
//!   _All-Photos/<fingerprint>.<ext>   unique physical home of asset bytes
//!   <album tree>/                     dirs mirroring the remote hierarchy
//!     .album                          the album's UUID
//!     .archive                        marker + member list of frozen albums
//!     <original name> -> ../_All-Photos/<fingerprint>.<ext>
//!   _Archive/                         stranded archived subtrees
//!   .library.lock                     PID of the mutating process
//! ```
//!
//! ## Design decisions
//!
//! - **Atomic writes**: downloads land in a dot-prefixed staging file inside
//!   `_All-Photos` and are renamed into place, so a crash never leaves a
//!   half-written asset under a final name.
//! - **UUID markers**: each album directory carries its UUID in a `.album`
//!   file so the remote identity survives renames without a database.
//! - **Archive member list**: the `.archive` marker stores the member
//!   fingerprints (one per line); after the symlinks are replaced by real
//!   files during archival, this is what keeps the reference bookkeeping
//!   recoverable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use frostpix_core::domain::failure::Failure;
use frostpix_core::domain::newtypes::{AlbumId, Fingerprint, RecordName};
use frostpix_core::domain::{Album, Asset, AssetVariant, LibrarySnapshot};
use frostpix_core::ports::local_library::LocalLibrary;
use frostpix_core::ports::observer::{NullObserver, SyncObserver};

/// Unique physical home of every downloaded byte.
pub const ALL_PHOTOS_DIR: &str = "_All-Photos";

/// Holding area for archived subtrees that lost their remote parent.
pub const ARCHIVE_DIR: &str = "_Archive";

/// Per-directory marker holding the album UUID.
pub const ALBUM_MARKER: &str = ".album";

/// Per-directory marker of archived albums, holding member fingerprints.
pub const ARCHIVED_MARKER: &str = ".archive";

/// The on-disk library rooted at the configured data directory.
pub struct FsLibrary {
    data_dir: PathBuf,
    observer: Arc<dyn SyncObserver>,
}

impl FsLibrary {
    /// Creates a library handle rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            observer: Arc::new(NullObserver),
        }
    }

    /// Routes layout warnings through the given observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The library root.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of `_All-Photos`.
    pub fn all_photos_dir(&self) -> PathBuf {
        self.data_dir.join(ALL_PHOTOS_DIR)
    }

    /// Absolute path of `_Archive`.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_DIR)
    }

    fn report(&self, failure: Failure) {
        warn!(warning = %failure, "Library layout warning");
        self.observer.on_warning(&failure);
    }

    async fn ensure_layout(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(self.all_photos_dir())
            .await
            .map_err(|e| Failure::library("Cannot create library layout").with_source(e))?;
        Ok(())
    }

    // ========================================================================
    // Snapshot reading
    // ========================================================================

    async fn read_assets(&self, snapshot: &mut LibrarySnapshot) -> anyhow::Result<()> {
        let dir = self.all_photos_dir();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| Failure::library("Cannot read _All-Photos").with_source(e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Failure::library("Cannot iterate _All-Photos").with_source(e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                // Leftover staging file from an interrupted run.
                self.report(
                    Failure::library("Stray staging file in _All-Photos")
                        .warning()
                        .with_context("file", &name),
                );
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => {
                    self.report(
                        Failure::library("Unexpected entry in _All-Photos")
                            .warning()
                            .with_context("entry", &name),
                    );
                    continue;
                }
            };

            match parse_asset_file(&name, &metadata) {
                Ok(asset) => snapshot.insert_asset(asset),
                Err(failure) => self.report(failure),
            }
        }

        Ok(())
    }

    /// Recursively reads the album tree below `dir`.
    fn walk_albums<'a>(
        &'a self,
        dir: &'a Path,
        parent: Option<AlbumId>,
        snapshot: &'a mut LibrarySnapshot,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(dir)
                .await
                .map_err(|e| Failure::library("Cannot read album directory").with_source(e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Failure::library("Cannot iterate album directory").with_source(e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let path = entry.path();

                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                if !file_type.is_dir() {
                    continue;
                }
                if parent.is_none() && (name == ALL_PHOTOS_DIR || name == ARCHIVE_DIR) {
                    continue;
                }
                if name.starts_with('.') {
                    continue;
                }

                self.read_album_dir(&path, &name, parent, snapshot).await?;
            }

            Ok(())
        })
    }

    async fn read_album_dir(
        &self,
        path: &Path,
        name: &str,
        parent: Option<AlbumId>,
        snapshot: &mut LibrarySnapshot,
    ) -> anyhow::Result<()> {
        let id = match tokio::fs::read_to_string(path.join(ALBUM_MARKER)).await {
            Ok(content) => match content.trim().parse::<AlbumId>() {
                Ok(id) => id,
                Err(_) => {
                    self.report(
                        Failure::library("Album marker holds no valid UUID")
                            .warning()
                            .with_context("dir", path.display()),
                    );
                    return Ok(());
                }
            },
            Err(_) => {
                self.report(
                    Failure::library("Directory without album marker, skipping")
                        .warning()
                        .with_context("dir", path.display()),
                );
                return Ok(());
            }
        };

        let archive_marker = path.join(ARCHIVED_MARKER);
        let archived = tokio::fs::try_exists(&archive_marker).await.unwrap_or(false);

        let mut members = Vec::new();
        let mut child_dirs = Vec::new();

        if archived {
            // Archived members live in the marker file; the directory holds
            // real persisted copies, not links.
            if let Ok(content) = tokio::fs::read_to_string(&archive_marker).await {
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    match Fingerprint::decode(line.trim()) {
                        Ok(fp) => members.push(fp),
                        Err(_) => self.report(
                            Failure::library("Unreadable fingerprint in archive marker")
                                .warning()
                                .with_context("dir", path.display()),
                        ),
                    }
                }
            }
        }

        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| Failure::library("Cannot read album directory").with_source(e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Failure::library("Cannot iterate album directory").with_source(e))?
        {
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            if entry_name == ALBUM_MARKER || entry_name == ARCHIVED_MARKER {
                continue;
            }
            let entry_path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_symlink() {
                if archived {
                    self.report(
                        Failure::library("Symlink inside archived album")
                            .warning()
                            .with_context("link", entry_path.display()),
                    );
                    continue;
                }
                match self.resolve_membership(&entry_path, snapshot).await {
                    Some(fp) => members.push(fp),
                    None => self.report(
                        Failure::library("Dangling or foreign symlink, skipping")
                            .warning()
                            .with_context("link", entry_path.display()),
                    ),
                }
            } else if file_type.is_dir() {
                child_dirs.push((entry_path, entry_name));
            } else if !archived {
                self.report(
                    Failure::library("Stray file inside album directory")
                        .warning()
                        .with_context("file", entry_path.display()),
                );
            }
        }

        let album = if archived {
            Album::archived(id, name, parent, members)
        } else if !child_dirs.is_empty() {
            if !members.is_empty() {
                self.report(
                    Failure::library("Folder contains asset links, ignoring them")
                        .warning()
                        .with_context("dir", path.display()),
                );
            }
            Album::folder(id, name, parent)
        } else {
            Album::album(id, name, parent, members)
        };

        match album {
            Ok(album) => snapshot.insert_album(album),
            Err(e) => {
                self.report(
                    Failure::library("Invalid album directory name")
                        .warning()
                        .with_context("dir", path.display())
                        .with_source(e),
                );
                return Ok(());
            }
        }

        for (child_path, _) in child_dirs {
            self.walk_albums(&child_path, Some(id), snapshot).await?;
        }

        Ok(())
    }

    /// Resolves a membership symlink to the fingerprint it references.
    ///
    /// The link must point at an existing file inside `_All-Photos` whose
    /// stem decodes to a fingerprint present in the asset set.
    async fn resolve_membership(
        &self,
        link: &Path,
        snapshot: &LibrarySnapshot,
    ) -> Option<Fingerprint> {
        let target = tokio::fs::read_link(link).await.ok()?;
        let resolved = link.parent()?.join(&target);
        let canonical = tokio::fs::canonicalize(&resolved).await.ok()?;
        let all_photos = tokio::fs::canonicalize(self.all_photos_dir()).await.ok()?;
        if !canonical.starts_with(&all_photos) {
            return None;
        }

        let file_name = canonical.file_name()?.to_string_lossy().into_owned();
        let (stem, _) = file_name.split_once('.')?;
        let fingerprint = Fingerprint::decode(stem).ok()?;
        snapshot.asset(&fingerprint)?;
        Some(fingerprint)
    }

    /// Collects the `_All-Photos` file names still referenced by a symlink
    /// anywhere in the album tree (including `_Archive`, where stale links
    /// may survive an interrupted archival).
    fn collect_link_targets<'a>(
        &'a self,
        dir: &'a Path,
        targets: &'a mut HashSet<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(_) => return Ok(()),
            };

            while let Some(entry) = entries.next_entry().await.unwrap_or(None) {
                let name = entry.file_name().to_string_lossy().into_owned();
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };

                if file_type.is_symlink() {
                    if let Ok(target) = tokio::fs::read_link(entry.path()).await {
                        if let Some(file_name) = target.file_name() {
                            targets.insert(file_name.to_string_lossy().into_owned());
                        }
                    }
                } else if file_type.is_dir() && name != ALL_PHOTOS_DIR {
                    self.collect_link_targets(&entry.path(), targets).await?;
                }
            }

            Ok(())
        })
    }

    async fn find_asset_file(&self, fingerprint: &Fingerprint) -> anyhow::Result<Option<PathBuf>> {
        let stem = fingerprint.encode();
        let prefix = format!("{stem}.");
        let mut entries = tokio::fs::read_dir(self.all_photos_dir())
            .await
            .map_err(|e| Failure::library("Cannot read _All-Photos").with_source(e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Failure::library("Cannot iterate _All-Photos").with_source(e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    async fn remove_existing_links(&self, dir: &Path) -> anyhow::Result<()> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| Failure::library("Cannot read album directory").with_source(e))?;
        while let Some(entry) = entries.next_entry().await.unwrap_or(None) {
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_symlink() {
                    tokio::fs::remove_file(entry.path()).await.map_err(|e| {
                        Failure::library("Cannot remove stale album link").with_source(e)
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Verification walk below one directory. Archived subtrees are skipped
    /// entirely: nothing may touch them and their persisted copies are not
    /// symlinks anyway.
    fn verify_links<'a>(
        &'a self,
        dir: &'a Path,
        all_photos: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if tokio::fs::try_exists(dir.join(ARCHIVED_MARKER))
                .await
                .unwrap_or(false)
            {
                return Ok(());
            }

            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(_) => return Ok(()),
            };

            while let Some(entry) = entries.next_entry().await.unwrap_or(None) {
                let name = entry.file_name().to_string_lossy().into_owned();
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };

                if file_type.is_symlink() {
                    let canonical = tokio::fs::canonicalize(entry.path()).await.map_err(|e| {
                        Failure::library("Album link does not resolve")
                            .with_context("link", entry.path().display())
                            .with_source(e)
                    })?;
                    if !canonical.starts_with(all_photos) {
                        return Err(Failure::library("Album link points outside _All-Photos")
                            .with_context("link", entry.path().display())
                            .with_context("target", canonical.display())
                            .into());
                    }
                } else if file_type.is_dir() && name != ALL_PHOTOS_DIR {
                    self.verify_links(&entry.path(), all_photos).await?;
                }
            }

            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl LocalLibrary for FsLibrary {
    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    async fn read_snapshot(&self) -> anyhow::Result<LibrarySnapshot> {
        self.ensure_layout().await?;

        let mut snapshot = LibrarySnapshot::new();
        self.read_assets(&mut snapshot).await?;
        self.walk_albums(&self.data_dir, None, &mut snapshot).await?;

        let archive_dir = self.archive_dir();
        if tokio::fs::try_exists(&archive_dir).await.unwrap_or(false) {
            self.walk_albums(&archive_dir, None, &mut snapshot).await?;
        }

        debug!(
            assets = snapshot.asset_count(),
            albums = snapshot.album_count(),
            "Local snapshot read"
        );
        Ok(snapshot)
    }

    fn stage_path(&self, asset: &Asset) -> PathBuf {
        // Dot-prefixed temp in the same directory keeps the eventual rename
        // atomic (same filesystem) and invisible to the snapshot walk.
        self.all_photos_dir()
            .join(format!(".{}.part", asset.disk_name()))
    }

    async fn commit_asset(&self, asset: &Asset) -> anyhow::Result<()> {
        let stage = self.stage_path(asset);
        let target = self.all_photos_dir().join(asset.disk_name());
        tokio::fs::rename(&stage, &target).await.map_err(|e| {
            Failure::library("Cannot commit staged asset")
                .with_context("asset", asset.disk_name())
                .with_source(e)
        })?;
        debug!(file = %asset.disk_name(), "Asset committed");
        Ok(())
    }

    async fn abort_stage(&self, asset: &Asset) -> anyhow::Result<()> {
        let stage = self.stage_path(asset);
        match tokio::fs::remove_file(&stage).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Failure::library("Cannot remove staging file")
                .with_context("stage", stage.display())
                .with_source(e)
                .into()),
        }
    }

    async fn delete_asset(&self, fingerprint: &Fingerprint) -> anyhow::Result<bool> {
        let Some(path) = self.find_asset_file(fingerprint).await? else {
            return Ok(false);
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut targets = HashSet::new();
        self.collect_link_targets(&self.data_dir, &mut targets)
            .await?;
        if targets.contains(&file_name) {
            debug!(file = %file_name, "Asset still referenced by an album link");
            return Ok(false);
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Failure::library("Cannot delete asset file").with_source(e))?;
        debug!(file = %file_name, "Asset deleted");
        Ok(true)
    }

    #[instrument(skip(self, album, snapshot), fields(album = %album.name()))]
    async fn write_album(
        &self,
        album: &Album,
        snapshot: &LibrarySnapshot,
    ) -> anyhow::Result<()> {
        if album.is_archived() {
            debug!("Refusing to write archived album");
            return Ok(());
        }

        let rel = snapshot.album_path(album.id()).ok_or_else(|| {
            Failure::library("Album has no resolvable path")
                .with_context("album", album.id())
                .with_context("name", album.name())
        })?;
        let dir = self.data_dir.join(&rel);

        // A frozen directory under the same path is never rewritten.
        if tokio::fs::try_exists(dir.join(ARCHIVED_MARKER))
            .await
            .unwrap_or(false)
        {
            self.report(
                Failure::library("Album path is archived on disk, leaving it untouched")
                    .warning()
                    .with_context("dir", dir.display()),
            );
            return Ok(());
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Failure::library("Cannot create album directory").with_source(e))?;
        tokio::fs::write(dir.join(ALBUM_MARKER), album.id().to_string())
            .await
            .map_err(|e| Failure::library("Cannot write album marker").with_source(e))?;

        self.remove_existing_links(&dir).await?;

        let mut prefix = PathBuf::new();
        for _ in 0..rel.components().count() {
            prefix.push("..");
        }

        for fingerprint in album.members() {
            let Some(asset) = snapshot.asset(fingerprint) else {
                self.report(
                    Failure::library("Album member missing from snapshot")
                        .warning()
                        .with_context("album", album.name())
                        .with_context("fingerprint", fingerprint),
                );
                continue;
            };

            let target = prefix.join(ALL_PHOTOS_DIR).join(asset.disk_name());
            let mut link_path = dir.join(asset.link_name());
            if tokio::fs::try_exists(&link_path).await.unwrap_or(false) {
                // Distinct assets can share an original filename; keep both
                // by prefixing the later one with a fingerprint fragment.
                let stem: String = fingerprint.encode().chars().take(8).collect();
                link_path = dir.join(format!("{stem}-{}", asset.link_name()));
            }

            tokio::fs::symlink(&target, &link_path)
                .await
                .map_err(|e| {
                    Failure::library("Cannot create album link")
                        .with_context("link", link_path.display())
                        .with_source(e)
                })?;
        }

        debug!(dir = %dir.display(), members = album.members().len(), "Album written");
        Ok(())
    }

    async fn delete_album(
        &self,
        album: &Album,
        snapshot: &LibrarySnapshot,
    ) -> anyhow::Result<()> {
        if album.is_archived() {
            debug!(album = %album.name(), "Refusing to delete archived album");
            return Ok(());
        }

        let Some(rel) = snapshot.album_path(album.id()) else {
            return Ok(());
        };
        let dir = self.data_dir.join(&rel);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(());
        }
        if tokio::fs::try_exists(dir.join(ARCHIVED_MARKER))
            .await
            .unwrap_or(false)
        {
            self.report(
                Failure::library("Album is archived on disk, not deleting")
                    .warning()
                    .with_context("dir", dir.display()),
            );
            return Ok(());
        }

        self.remove_existing_links(&dir).await?;
        let _ = tokio::fs::remove_file(dir.join(ALBUM_MARKER)).await;

        match tokio::fs::remove_dir(&dir).await {
            Ok(()) => {
                debug!(dir = %dir.display(), "Album deleted");
                Ok(())
            }
            Err(e) => {
                // Leftover children (e.g. a relocation that has not happened
                // yet, or foreign files) keep the directory alive.
                self.report(
                    Failure::library("Album directory not empty, leaving it")
                        .warning()
                        .with_context("dir", dir.display())
                        .with_source(e),
                );
                Ok(())
            }
        }
    }

    async fn move_stranded_archives(
        &self,
        local: &LibrarySnapshot,
        remote: &LibrarySnapshot,
    ) -> anyhow::Result<Vec<AlbumId>> {
        let mut moved = Vec::new();

        for album in local.albums().values() {
            if !album.is_archived() {
                continue;
            }
            let Some(parent) = album.parent() else {
                continue;
            };
            if remote.album(parent).is_some() {
                continue;
            }
            let Some(rel) = local.album_path(album.id()) else {
                continue;
            };

            let from = self.data_dir.join(&rel);
            if !tokio::fs::try_exists(&from).await.unwrap_or(false) {
                continue;
            }

            let archive_dir = self.archive_dir();
            tokio::fs::create_dir_all(&archive_dir)
                .await
                .map_err(|e| Failure::library("Cannot create _Archive").with_source(e))?;

            let mut to = archive_dir.join(album.name());
            let mut suffix = 1;
            while tokio::fs::try_exists(&to).await.unwrap_or(false) {
                to = archive_dir.join(format!("{}-{suffix}", album.name()));
                suffix += 1;
            }

            tokio::fs::rename(&from, &to).await.map_err(|e| {
                Failure::library("Cannot relocate stranded archive")
                    .with_context("from", from.display())
                    .with_context("to", to.display())
                    .with_source(e)
            })?;

            info!(from = %from.display(), to = %to.display(), "Stranded archive relocated");
            moved.push(*album.id());
        }

        Ok(moved)
    }

    async fn verify(&self) -> anyhow::Result<()> {
        // No two asset files may share a fingerprint stem.
        let mut stems = HashSet::new();
        let mut entries = tokio::fs::read_dir(self.all_photos_dir())
            .await
            .map_err(|e| Failure::library("Cannot read _All-Photos").with_source(e))?;
        while let Some(entry) = entries.next_entry().await.unwrap_or(None) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let stem = name
                .split_once('.')
                .map(|(s, _)| s.to_string())
                .unwrap_or(name);
            if !stems.insert(stem.clone()) {
                return Err(Failure::library("Duplicate fingerprint stem in _All-Photos")
                    .with_context("stem", stem)
                    .into());
            }
        }

        let all_photos = tokio::fs::canonicalize(self.all_photos_dir())
            .await
            .map_err(|e| Failure::library("Cannot canonicalize _All-Photos").with_source(e))?;

        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(|e| Failure::library("Cannot read data directory").with_source(e))?;
        while let Some(entry) = entries.next_entry().await.unwrap_or(None) {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() && name != ALL_PHOTOS_DIR && name != ARCHIVE_DIR {
                self.verify_links(&entry.path(), &all_photos).await?;
            }
        }

        Ok(())
    }
}

/// Parses a `_All-Photos` entry name (`<fingerprint>.<ext>`) into the local
/// view of an asset. Local record names are placeholders; diffing keys on
/// fingerprints only.
fn parse_asset_file(name: &str, metadata: &std::fs::Metadata) -> Result<Asset, Failure> {
    let Some((stem, extension)) = name.split_once('.') else {
        return Err(Failure::library("Asset file without extension")
            .warning()
            .with_context("file", name));
    };

    let fingerprint = Fingerprint::decode(stem).map_err(|e| {
        Failure::library("Asset file name does not decode to a fingerprint")
            .warning()
            .with_context("file", name)
            .with_source(e)
    })?;

    let modified: DateTime<Utc> = metadata
        .modified()
        .map(Into::into)
        .unwrap_or_else(|_| Utc::now());

    let record_name = RecordName::new(format!("local-{stem}")).map_err(|e| {
        Failure::library("Cannot derive local record name")
            .warning()
            .with_context("file", name)
            .with_source(e)
    })?;

    Asset::new(
        record_name,
        fingerprint,
        metadata.len(),
        name,
        modified,
        false,
        AssetVariant::Original,
        extension,
        None,
    )
    .map_err(|e| {
        Failure::library("Unreadable asset file name")
            .warning()
            .with_context("file", name)
            .with_source(e)
    })
}
