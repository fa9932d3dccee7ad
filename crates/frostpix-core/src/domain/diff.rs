//! Snapshot diffing
//!
//! Pure reconciliation of a remote snapshot against a local snapshot,
//! producing the minimal change set the sync engine applies. Archived
//! subtrees are invisible to the diff: they are never deleted, never
//! rewritten, and assets only they reference are never removed.

use std::collections::HashSet;

use super::album::Album;
use super::newtypes::{AlbumId, Fingerprint};
use super::snapshot::LibrarySnapshot;

/// The change set produced by [`diff`].
///
/// Album creations are ordered parents-first, deletions children-first, so
/// the engine can apply them in sequence and keep intermediate trees
/// consistent. A matched album pair that differs in name, parent or kind
/// appears as delete + create (album directories hold no byte-owning
/// content, so a rebuild is safe and simpler than a rename protocol);
/// a pair that differs only in membership appears as a create alone, which
/// the local library applies as a symlink refresh.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Remote assets with no local counterpart, to download
    pub assets_to_add: Vec<Fingerprint>,
    /// Fingerprints present on both sides
    pub assets_to_keep: Vec<Fingerprint>,
    /// Local-only fingerprints to remove (archived references excluded)
    pub assets_to_delete: Vec<Fingerprint>,
    /// Albums to (re)write, parents before children
    pub albums_to_create: Vec<Album>,
    /// Albums to remove, children before parents
    pub albums_to_delete: Vec<AlbumId>,
}

impl SyncPlan {
    /// Returns true when the plan contains no work at all.
    pub fn is_empty(&self) -> bool {
        self.assets_to_add.is_empty()
            && self.assets_to_delete.is_empty()
            && self.albums_to_create.is_empty()
            && self.albums_to_delete.is_empty()
    }

    /// Total number of write operations in the plan.
    pub fn change_count(&self) -> usize {
        self.assets_to_add.len()
            + self.assets_to_delete.len()
            + self.albums_to_create.len()
            + self.albums_to_delete.len()
    }
}

/// Computes the change set that turns `local` into `remote`, honoring
/// archived subtrees in `local`.
pub fn diff(remote: &LibrarySnapshot, local: &LibrarySnapshot) -> SyncPlan {
    let mut plan = SyncPlan::default();

    // --- Assets, by fingerprint ---

    let archived_refs = local.archived_fingerprints();

    for fingerprint in remote.assets().keys() {
        if local.asset(fingerprint).is_some() {
            plan.assets_to_keep.push(fingerprint.clone());
        } else {
            plan.assets_to_add.push(fingerprint.clone());
        }
    }

    for fingerprint in local.assets().keys() {
        if remote.asset(fingerprint).is_none() && !archived_refs.contains(fingerprint) {
            plan.assets_to_delete.push(fingerprint.clone());
        }
    }

    // --- Albums, by UUID ---

    // Everything in an archived subtree is off-limits: the archived nodes
    // themselves, their local descendants, and any remote album that would
    // land inside one.
    let frozen = local.frozen_album_ids();

    let mut creations: Vec<Album> = Vec::new();
    for album in remote.albums().values() {
        if frozen.contains(album.id()) {
            continue;
        }
        match local.album(album.id()) {
            None => creations.push(album.clone()),
            Some(existing) => {
                let moved = existing.name() != album.name()
                    || existing.parent() != album.parent()
                    || existing.kind() != album.kind();
                let members_changed = !same_members(existing.members(), album.members());
                if moved {
                    plan.albums_to_delete.push(*existing.id());
                    creations.push(album.clone());
                } else if members_changed {
                    creations.push(album.clone());
                }
            }
        }
    }

    for album in local.albums().values() {
        if frozen.contains(album.id()) {
            continue;
        }
        if remote.album(album.id()).is_none() {
            plan.albums_to_delete.push(*album.id());
        }
    }

    plan.albums_to_create = order_parents_first(creations);
    order_children_first(&mut plan.albums_to_delete, local);

    plan
}

fn same_members(a: &[Fingerprint], b: &[Fingerprint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let set: HashSet<&Fingerprint> = a.iter().collect();
    b.iter().all(|fp| set.contains(fp))
}

/// Orders albums so every parent precedes its children. Albums whose parent
/// is not part of the creation set are ready immediately (the parent already
/// exists locally or the album is a root).
fn order_parents_first(pending: Vec<Album>) -> Vec<Album> {
    let creation_ids: HashSet<AlbumId> = pending.iter().map(|a| *a.id()).collect();
    let mut ordered = Vec::with_capacity(pending.len());
    let mut placed: HashSet<AlbumId> = HashSet::new();
    let mut remaining = pending;

    while !remaining.is_empty() {
        let before = remaining.len();
        let (ready, rest): (Vec<Album>, Vec<Album>) =
            remaining.into_iter().partition(|album| match album.parent() {
                None => true,
                Some(parent) => placed.contains(parent) || !creation_ids.contains(parent),
            });
        for album in ready {
            placed.insert(*album.id());
            ordered.push(album);
        }
        // If a full pass places nothing, the remainder has missing or cyclic
        // parents; append as-is and let the library layer surface the failure
        // with context.
        if rest.len() == before {
            ordered.extend(rest);
            break;
        }
        remaining = rest;
    }

    ordered
}

/// Orders deletions deepest-first so children go before their parents.
fn order_children_first(ids: &mut [AlbumId], local: &LibrarySnapshot) {
    ids.sort_by_key(|id| {
        let depth = local
            .album_path(id)
            .map(|p| p.components().count())
            .unwrap_or(0);
        std::cmp::Reverse(depth)
    });
}
