//! Remote photo service ports (driven/secondary ports)
//!
//! [`RemoteLibrary`] is the record-zone query surface of the photo service;
//! the reverse-engineered wire protocol lives entirely behind it and may
//! drift without touching the engines. [`AuthSession`] is the narrow
//! session-recovery hook the sync engine needs for its retry loop.

use std::path::Path;

use crate::domain::newtypes::RecordName;
use crate::domain::{Asset, LibrarySnapshot};

/// Port trait for the remote photo library.
///
/// ## Implementation notes
///
/// - `fetch_all` handles pagination internally; ordering is irrelevant.
/// - `download_asset` must verify the received byte length and the computed
///   content fingerprint against the asset's declared values, and fail with
///   a recoverable integrity failure on mismatch.
/// - Transport failures, token-expiry 401s and rate-limit responses are
///   reported as recoverable; malformed records are fatal.
#[async_trait::async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Lists every album and asset record across all zones and returns the
    /// remote snapshot with the parent map derived.
    async fn fetch_all(&self) -> anyhow::Result<LibrarySnapshot>;

    /// Streams the asset body to `dest`, verifying length and fingerprint
    /// on the fly.
    async fn download_asset(&self, asset: &Asset, dest: &Path) -> anyhow::Result<()>;

    /// Marks the given asset records as deleted upstream (archive support).
    async fn delete_assets(&self, records: &[RecordName]) -> anyhow::Result<()>;
}

/// Session-recovery port used by the sync engine between retry attempts.
#[async_trait::async_trait]
pub trait AuthSession: Send + Sync {
    /// Rebuilds the session from stored credentials and the trust token.
    ///
    /// Called mid-run after a recoverable failure; must not require user
    /// interaction (an MFA requirement at this point is a fatal auth
    /// failure).
    async fn refresh(&self) -> anyhow::Result<()>;
}
