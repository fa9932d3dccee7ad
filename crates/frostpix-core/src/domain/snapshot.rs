//! Library state snapshot
//!
//! A [`LibrarySnapshot`] is the complete set of assets, albums and parent
//! relations at a point in time. The remote and the local side produce the
//! same shape, so diffing is plain set arithmetic over two snapshots.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use super::album::{Album, AlbumKind};
use super::asset::Asset;
use super::errors::DomainError;
use super::newtypes::{AlbumId, Fingerprint};

/// Unordered collections of assets (by fingerprint) and albums (by UUID).
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    assets: HashMap<Fingerprint, Asset>,
    albums: HashMap<AlbumId, Album>,
}

impl LibrarySnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an asset, replacing any previous asset with the same
    /// fingerprint (they are interchangeable by definition).
    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.fingerprint().clone(), asset);
    }

    /// Inserts an album, replacing any previous album with the same id.
    pub fn insert_album(&mut self, album: Album) {
        self.albums.insert(*album.id(), album);
    }

    /// Returns all assets keyed by fingerprint.
    pub fn assets(&self) -> &HashMap<Fingerprint, Asset> {
        &self.assets
    }

    /// Returns all albums keyed by id.
    pub fn albums(&self) -> &HashMap<AlbumId, Album> {
        &self.albums
    }

    /// Looks up an asset by fingerprint.
    pub fn asset(&self, fingerprint: &Fingerprint) -> Option<&Asset> {
        self.assets.get(fingerprint)
    }

    /// Looks up an album by id.
    pub fn album(&self, id: &AlbumId) -> Option<&Album> {
        self.albums.get(id)
    }

    /// Number of assets in the snapshot.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Number of albums in the snapshot.
    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    /// The relative directory path of an album, walking the parent chain.
    ///
    /// Returns `None` if the chain hits a missing parent or a cycle.
    pub fn album_path(&self, id: &AlbumId) -> Option<PathBuf> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(*id);

        while let Some(album_id) = current {
            if !seen.insert(album_id) {
                return None; // cycle
            }
            let album = self.albums.get(&album_id)?;
            segments.push(album.name().to_string());
            current = album.parent().copied();
        }

        segments.reverse();
        Some(segments.iter().collect())
    }

    /// Direct children of the given album (or the roots for `None`).
    pub fn children(&self, parent: Option<&AlbumId>) -> Vec<&Album> {
        self.albums
            .values()
            .filter(|a| a.parent() == parent)
            .collect()
    }

    /// All album ids in the subtree rooted at `id`, including `id` itself.
    pub fn descendants(&self, id: &AlbumId) -> Vec<AlbumId> {
        let mut result = Vec::new();
        let mut queue = vec![*id];
        while let Some(current) = queue.pop() {
            result.push(current);
            for child in self.children(Some(&current)) {
                queue.push(*child.id());
            }
        }
        result
    }

    /// Fingerprints referenced by at least one archived album.
    ///
    /// These block physical deletion from `_All-Photos` even when no remote
    /// asset with the fingerprint remains.
    pub fn archived_fingerprints(&self) -> HashSet<Fingerprint> {
        self.albums
            .values()
            .filter(|a| a.is_archived())
            .flat_map(|a| a.members().iter().cloned())
            .collect()
    }

    /// Album ids frozen by archival: every archived album and everything
    /// below it.
    pub fn frozen_album_ids(&self) -> HashSet<AlbumId> {
        let mut frozen = HashSet::new();
        for album in self.albums.values() {
            if album.is_archived() {
                frozen.extend(self.descendants(album.id()));
            }
        }
        frozen
    }

    /// Checks the structural invariants of the album forest:
    /// - the parent relation is acyclic and parents exist
    /// - albums have only asset members, folders have none
    /// - folders never appear as members of anything (implied by the schema)
    pub fn validate(&self) -> Result<(), DomainError> {
        for album in self.albums.values() {
            if let Some(parent_id) = album.parent() {
                let parent = self.albums.get(parent_id).ok_or_else(|| {
                    DomainError::InvalidSnapshot(format!(
                        "album '{}' references missing parent {parent_id}",
                        album.name()
                    ))
                })?;
                if parent.kind() == AlbumKind::Album {
                    return Err(DomainError::InvalidSnapshot(format!(
                        "album '{}' is parented to non-folder '{}'",
                        album.name(),
                        parent.name()
                    )));
                }
            }
            if album.kind() == AlbumKind::Folder && !album.members().is_empty() {
                return Err(DomainError::InvalidSnapshot(format!(
                    "folder '{}' has asset members",
                    album.name()
                )));
            }
            if self.album_path(album.id()).is_none() {
                return Err(DomainError::InvalidSnapshot(format!(
                    "album '{}' has a broken or cyclic parent chain",
                    album.name()
                )));
            }
        }
        Ok(())
    }
}
