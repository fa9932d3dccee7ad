//! Local library port (driven/secondary port)
//!
//! The filesystem tree under the data directory is the sole source of truth
//! about local state; this port is the only mutation surface the engines
//! use. Implementations must keep the atomic-rename discipline: asset bytes
//! never appear under `_All-Photos` under a non-final name except as a
//! dot-prefixed temp in the same directory.

use std::path::PathBuf;

use crate::domain::newtypes::{AlbumId, Fingerprint};
use crate::domain::{Album, Asset, LibrarySnapshot};

/// Port trait for the on-disk library.
#[async_trait::async_trait]
pub trait LocalLibrary: Send + Sync {
    /// Walks the data directory and reconstructs the local snapshot.
    ///
    /// Stray files, dangling links and unexpected names are reported as
    /// warnings through the observer side channel and skipped.
    async fn read_snapshot(&self) -> anyhow::Result<LibrarySnapshot>;

    /// The dot-prefixed staging path inside `_All-Photos` where a download
    /// for `asset` must be written before commit.
    fn stage_path(&self, asset: &Asset) -> PathBuf;

    /// Atomically renames a completed staging file to its final
    /// fingerprint filename.
    async fn commit_asset(&self, asset: &Asset) -> anyhow::Result<()>;

    /// Removes a partial staging file after a failed or cancelled download.
    async fn abort_stage(&self, asset: &Asset) -> anyhow::Result<()>;

    /// Removes the asset file if no album link still points at it.
    /// Returns `true` if the file was removed.
    async fn delete_asset(&self, fingerprint: &Fingerprint) -> anyhow::Result<bool>;

    /// Creates or rewrites an album directory (and its parents) and
    /// replaces its entries with fresh symlinks into `_All-Photos`.
    /// Archived albums are never touched.
    async fn write_album(&self, album: &Album, snapshot: &LibrarySnapshot)
        -> anyhow::Result<()>;

    /// Removes an album directory. The caller orders deletions
    /// children-first.
    async fn delete_album(&self, album: &Album, snapshot: &LibrarySnapshot)
        -> anyhow::Result<()>;

    /// Relocates archived albums whose remote parent has disappeared into
    /// the top-level `_Archive/` holding area. Returns the ids moved.
    async fn move_stranded_archives(
        &self,
        local: &LibrarySnapshot,
        remote: &LibrarySnapshot,
    ) -> anyhow::Result<Vec<AlbumId>>;

    /// Verifies the layout invariants after a write phase: every symlink
    /// resolves inside `_All-Photos` and no two files share a fingerprint
    /// stem.
    async fn verify(&self) -> anyhow::Result<()>;
}
