//! CLI output formatting and console observers
//!
//! The engines report progress through the observer ports; the console
//! observers here render those events either as human-readable lines or as
//! one JSON object per line (for scripting).

use frostpix_core::domain::diff::SyncPlan;
use frostpix_core::domain::newtypes::Fingerprint;
use frostpix_core::domain::{Album, Asset, Failure};
use frostpix_core::ports::observer::{
    ArchiveObserver, AuthObserver, AuthStage, SyncObserver, SyncTotals,
};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    fn event(self, value: serde_json::Value, human: impl FnOnce()) {
        match self {
            OutputFormat::Json => println!("{value}"),
            OutputFormat::Human => human(),
        }
    }

    fn warning(self, failure: &Failure) {
        match self {
            OutputFormat::Json => eprintln!(
                "{}",
                serde_json::json!({
                    "event": "warning",
                    "kind": failure.kind().to_string(),
                    "message": failure.message(),
                    "context": failure.context(),
                })
            ),
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {}", failure.message()),
        }
    }
}

/// Prints the final sync summary.
pub fn print_totals(format: OutputFormat, totals: &SyncTotals) {
    format.event(
        serde_json::json!({
            "event": "done",
            "assets_downloaded": totals.assets_downloaded,
            "assets_deleted": totals.assets_deleted,
            "albums_written": totals.albums_written,
            "albums_deleted": totals.albums_deleted,
            "warnings": totals.warnings,
            "duration_ms": totals.duration_ms,
        }),
        || {
            println!(
                "\u{2713} Sync complete: {} downloaded, {} deleted, {} albums written, {} albums removed ({} ms)",
                totals.assets_downloaded,
                totals.assets_deleted,
                totals.albums_written,
                totals.albums_deleted,
                totals.duration_ms
            );
        },
    );
}

/// Prints the trust token.
pub fn print_token(format: OutputFormat, token: &str) {
    format.event(
        serde_json::json!({ "event": "trust_token", "token": token }),
        || println!("{token}"),
    );
}

// ============================================================================
// Console observers
// ============================================================================

/// Renders auth progress on the console.
pub struct ConsoleAuthObserver {
    format: OutputFormat,
}

impl ConsoleAuthObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl AuthObserver for ConsoleAuthObserver {
    fn on_stage(&self, stage: AuthStage) {
        self.format.event(
            serde_json::json!({ "event": "auth_stage", "stage": stage.to_string() }),
            || println!("  auth: {stage}"),
        );
    }

    fn on_mfa_waiting(&self, port: u16) {
        self.format.event(
            serde_json::json!({ "event": "mfa_waiting", "port": port }),
            || {
                println!(
                    "  Waiting for MFA code on port {port}: POST /mfa?code=<6 digits> \
                     (or /resend_mfa?method=device|sms|voice)"
                );
            },
        );
    }

    fn on_warning(&self, failure: &Failure) {
        self.format.warning(failure);
    }
}

/// Renders sync progress on the console.
pub struct ConsoleSyncObserver {
    format: OutputFormat,
}

impl ConsoleSyncObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl SyncObserver for ConsoleSyncObserver {
    fn on_fetch_started(&self) {
        self.format.event(
            serde_json::json!({ "event": "fetch_started" }),
            || println!("  Loading remote and local snapshots..."),
        );
    }

    fn on_snapshots_loaded(&self, remote: (usize, usize), local: (usize, usize)) {
        self.format.event(
            serde_json::json!({
                "event": "snapshots_loaded",
                "remote": { "assets": remote.0, "albums": remote.1 },
                "local": { "assets": local.0, "albums": local.1 },
            }),
            || {
                println!(
                    "  Remote: {} assets in {} albums; local: {} assets in {} albums",
                    remote.0, remote.1, local.0, local.1
                );
            },
        );
    }

    fn on_plan(&self, plan: &SyncPlan) {
        self.format.event(
            serde_json::json!({
                "event": "plan",
                "assets_to_add": plan.assets_to_add.len(),
                "assets_to_keep": plan.assets_to_keep.len(),
                "assets_to_delete": plan.assets_to_delete.len(),
                "albums_to_create": plan.albums_to_create.len(),
                "albums_to_delete": plan.albums_to_delete.len(),
            }),
            || {
                println!(
                    "  Plan: +{} assets, -{} assets, {} kept; albums +{} -{}",
                    plan.assets_to_add.len(),
                    plan.assets_to_delete.len(),
                    plan.assets_to_keep.len(),
                    plan.albums_to_create.len(),
                    plan.albums_to_delete.len()
                );
            },
        );
    }

    fn on_asset_written(&self, asset: &Asset, done: usize, total: usize) {
        self.format.event(
            serde_json::json!({
                "event": "asset_written",
                "name": asset.original_name(),
                "done": done,
                "total": total,
            }),
            || println!("  [{done}/{total}] {}", asset.original_name()),
        );
    }

    fn on_asset_deleted(&self, fingerprint: &Fingerprint) {
        self.format.event(
            serde_json::json!({ "event": "asset_deleted", "fingerprint": fingerprint.encode() }),
            || println!("  deleted {fingerprint}"),
        );
    }

    fn on_album_written(&self, album: &Album) {
        self.format.event(
            serde_json::json!({ "event": "album_written", "name": album.name() }),
            || println!("  album: {}", album.name()),
        );
    }

    fn on_retry(&self, attempt: u32, max_retries: u32, failure: &Failure) {
        self.format.event(
            serde_json::json!({
                "event": "retry",
                "attempt": attempt,
                "max_retries": max_retries,
                "reason": failure.message(),
            }),
            || {
                eprintln!(
                    "\u{26a0} Recoverable failure ({}), retry {attempt}/{max_retries}",
                    failure.message()
                );
            },
        );
    }

    fn on_warning(&self, failure: &Failure) {
        self.format.warning(failure);
    }

    fn on_complete(&self, totals: &SyncTotals) {
        let _ = totals; // the command prints the final summary
    }
}

/// Renders archive progress on the console.
pub struct ConsoleArchiveObserver {
    format: OutputFormat,
}

impl ConsoleArchiveObserver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl ArchiveObserver for ConsoleArchiveObserver {
    fn on_member_persisted(&self, asset: &Asset, done: usize, total: usize) {
        self.format.event(
            serde_json::json!({
                "event": "member_persisted",
                "name": asset.original_name(),
                "done": done,
                "total": total,
            }),
            || println!("  [{done}/{total}] persisted {}", asset.original_name()),
        );
    }

    fn on_favorite_kept(&self, asset: &Asset) {
        self.format.event(
            serde_json::json!({ "event": "favorite_kept", "name": asset.original_name() }),
            || println!("  favorite kept remotely: {}", asset.original_name()),
        );
    }

    fn on_remote_deleted(&self, count: usize) {
        self.format.event(
            serde_json::json!({ "event": "remote_deleted", "count": count }),
            || println!("\u{2713} {count} remote originals deleted"),
        );
    }

    fn on_warning(&self, failure: &Failure) {
        self.format.warning(failure);
    }
}
