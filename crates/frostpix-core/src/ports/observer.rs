//! Observer ports (driving/primary side channels)
//!
//! Progress and warnings flow through a fixed observer capability set passed
//! into the engines, instead of runtime event-name subscription. The CLI,
//! the daemon and tests each plug in their own implementation; every method
//! has a no-op default so observers implement only what they render.

use crate::domain::diff::SyncPlan;
use crate::domain::newtypes::Fingerprint;
use crate::domain::{Album, Asset, Failure};

/// Observer-visible stage of the auth state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// No session established yet
    Unauthenticated,
    /// Waiting for an out-of-band MFA code
    MfaRequired,
    /// Session tokens obtained
    Authenticated,
    /// Photo-service endpoint resolved; requests may flow
    Ready,
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::MfaRequired => "mfa required",
            AuthStage::Authenticated => "authenticated",
            AuthStage::Ready => "ready",
        };
        write!(f, "{s}")
    }
}

/// Counters reported when a sync run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncTotals {
    /// Assets downloaded and committed
    pub assets_downloaded: u32,
    /// Asset files removed from `_All-Photos`
    pub assets_deleted: u32,
    /// Album directories created or rewritten
    pub albums_written: u32,
    /// Album directories removed
    pub albums_deleted: u32,
    /// Warnings reported along the way
    pub warnings: u32,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

/// Observer for the authentication flow.
pub trait AuthObserver: Send + Sync {
    /// A state-machine transition completed.
    fn on_stage(&self, stage: AuthStage) {
        let _ = stage;
    }

    /// The flow is blocked waiting for an MFA code on the HTTP endpoint.
    fn on_mfa_waiting(&self, port: u16) {
        let _ = port;
    }

    /// A non-aborting problem occurred (e.g. a resend to an unknown phone).
    fn on_warning(&self, failure: &Failure) {
        let _ = failure;
    }
}

/// Observer for sync runs.
pub trait SyncObserver: Send + Sync {
    /// Remote fetch and local snapshot read are starting.
    fn on_fetch_started(&self) {}

    /// Both snapshots are loaded.
    fn on_snapshots_loaded(&self, remote: (usize, usize), local: (usize, usize)) {
        let _ = (remote, local);
    }

    /// The change set has been computed.
    fn on_plan(&self, plan: &SyncPlan) {
        let _ = plan;
    }

    /// An asset download completed and was committed. Emitted in completion
    /// order, not submission order.
    fn on_asset_written(&self, asset: &Asset, done: usize, total: usize) {
        let _ = (asset, done, total);
    }

    /// An asset file was removed.
    fn on_asset_deleted(&self, fingerprint: &Fingerprint) {
        let _ = fingerprint;
    }

    /// An album directory was created or rewritten.
    fn on_album_written(&self, album: &Album) {
        let _ = album;
    }

    /// The pipeline is restarting after a recoverable failure.
    fn on_retry(&self, attempt: u32, max_retries: u32, failure: &Failure) {
        let _ = (attempt, max_retries, failure);
    }

    /// A non-aborting problem occurred (stray file, dangling link, ...).
    fn on_warning(&self, failure: &Failure) {
        let _ = failure;
    }

    /// The run finished successfully.
    fn on_complete(&self, totals: &SyncTotals) {
        let _ = totals;
    }
}

/// Observer for archive operations.
pub trait ArchiveObserver: Send + Sync {
    /// A member was persisted into the album directory.
    fn on_member_persisted(&self, asset: &Asset, done: usize, total: usize) {
        let _ = (asset, done, total);
    }

    /// A favorite was kept upstream (never deleted remotely).
    fn on_favorite_kept(&self, asset: &Asset) {
        let _ = asset;
    }

    /// Remote originals were marked deleted.
    fn on_remote_deleted(&self, count: usize) {
        let _ = count;
    }

    /// A non-aborting problem occurred.
    fn on_warning(&self, failure: &Failure) {
        let _ = failure;
    }
}

/// Observer that ignores everything; useful in tests and as a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl AuthObserver for NullObserver {}
impl SyncObserver for NullObserver {}
impl ArchiveObserver for NullObserver {}
