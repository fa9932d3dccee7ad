//! Album domain entity
//!
//! Albums are the logical grouping layer of the library. A `Folder` contains
//! other albums, an `Album` contains asset references, and an `Archived`
//! node is a locally-frozen subtree that no longer participates in syncs.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{AlbumId, Fingerprint};

/// Directory names reserved for the library itself; albums may not use them.
pub const RESERVED_DIR_NAMES: &[&str] = &["_All-Photos", "_Archive"];

/// The kind of an album node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumKind {
    /// Contains other albums/folders, never assets
    Folder,
    /// Contains asset references, never child albums
    Album,
    /// Locally frozen subtree; has no remote counterpart once archived
    Archived,
}

impl std::fmt::Display for AlbumKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlbumKind::Folder => write!(f, "folder"),
            AlbumKind::Album => write!(f, "album"),
            AlbumKind::Archived => write!(f, "archived"),
        }
    }
}

/// A named container in the album forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Stable remote identifier (UUID)
    id: AlbumId,
    /// Human-readable directory name
    name: String,
    /// Parent album; `None` for roots
    parent: Option<AlbumId>,
    /// Folder, album, or archived
    kind: AlbumKind,
    /// Member fingerprints (empty for folders)
    members: Vec<Fingerprint>,
}

impl Album {
    /// Creates a folder node.
    pub fn folder(
        id: AlbumId,
        name: impl Into<String>,
        parent: Option<AlbumId>,
    ) -> Result<Self, DomainError> {
        Self::build(id, name, parent, AlbumKind::Folder, Vec::new())
    }

    /// Creates an album node with asset members.
    pub fn album(
        id: AlbumId,
        name: impl Into<String>,
        parent: Option<AlbumId>,
        members: Vec<Fingerprint>,
    ) -> Result<Self, DomainError> {
        Self::build(id, name, parent, AlbumKind::Album, members)
    }

    /// Creates an archived node (local-only; produced by the archive engine
    /// or by reading a `.archive` marker off disk).
    pub fn archived(
        id: AlbumId,
        name: impl Into<String>,
        parent: Option<AlbumId>,
        members: Vec<Fingerprint>,
    ) -> Result<Self, DomainError> {
        Self::build(id, name, parent, AlbumKind::Archived, members)
    }

    fn build(
        id: AlbumId,
        name: impl Into<String>,
        parent: Option<AlbumId>,
        kind: AlbumKind,
        members: Vec<Fingerprint>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(DomainError::InvalidName(name));
        }
        if RESERVED_DIR_NAMES.contains(&name.as_str()) {
            return Err(DomainError::ReservedName(name));
        }
        Ok(Self {
            id,
            name,
            parent,
            kind,
            members,
        })
    }

    // --- Getters ---

    /// Returns the album's stable identifier
    pub fn id(&self) -> &AlbumId {
        &self.id
    }

    /// Returns the human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent album id, if any
    pub fn parent(&self) -> Option<&AlbumId> {
        self.parent.as_ref()
    }

    /// Returns the node kind
    pub fn kind(&self) -> AlbumKind {
        self.kind
    }

    /// Returns the member fingerprints (empty for folders)
    pub fn members(&self) -> &[Fingerprint] {
        &self.members
    }

    /// Returns true for archived nodes
    pub fn is_archived(&self) -> bool {
        self.kind == AlbumKind::Archived
    }

    /// Returns a copy of this album re-rooted under `_Archive` (no parent).
    ///
    /// Used when an archived album's remote parent has disappeared and the
    /// directory is relocated to the top-level holding area.
    #[must_use]
    pub fn stranded(mut self) -> Self {
        self.parent = None;
        self
    }

    /// Returns a copy of this album frozen as `Archived`.
    #[must_use]
    pub fn into_archived(mut self) -> Self {
        self.kind = AlbumKind::Archived;
        self
    }
}
