//! Differential sync engine
//!
//! Runs the three-phase pipeline with an outer retry loop:
//!
//! 1. **Fetch-and-load**: remote `fetch_all()` and local `read_snapshot()`
//!    in parallel.
//! 2. **Diff**: pure snapshot reconciliation ([`frostpix_core::domain::diff`]).
//! 3. **Write**: a bounded worker pool downloads missing assets (staging +
//!    atomic commit), asset deletions strictly follow the additions, then
//!    albums are written parents-first and deleted children-first.
//!
//! A recoverable failure escaping any phase cancels in-flight downloads
//! (partial staging files are deleted), refreshes the auth session, and
//! restarts from phase 1 up to the configured retry budget. Fatal failures
//! and signal-delivered interrupts bypass retry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use frostpix_core::config::Config;
use frostpix_core::domain::diff::diff;
use frostpix_core::domain::failure::{self, Failure, FailureKind};
use frostpix_core::domain::newtypes::Fingerprint;
use frostpix_core::domain::Asset;
use frostpix_core::ports::local_library::LocalLibrary;
use frostpix_core::ports::observer::{NullObserver, SyncObserver, SyncTotals};
use frostpix_core::ports::remote_library::{AuthSession, RemoteLibrary};

/// Download attempts per asset before an integrity mismatch turns fatal.
const INTEGRITY_RETRY_BUDGET: u32 = 3;

/// One-way differential sync engine.
///
/// ## Dependencies
///
/// - `remote`: record-zone queries and verified downloads
/// - `local`: the filesystem library (sole mutation surface)
/// - `session`: mid-run auth recovery between retry attempts
/// - `observer`: progress and warning side channel
pub struct SyncEngine {
    remote: Arc<dyn RemoteLibrary>,
    local: Arc<dyn LocalLibrary>,
    session: Arc<dyn AuthSession>,
    observer: Arc<dyn SyncObserver>,
    max_retries: u32,
    download_threads: usize,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine with the sync settings from `config`.
    pub fn new(
        remote: Arc<dyn RemoteLibrary>,
        local: Arc<dyn LocalLibrary>,
        session: Arc<dyn AuthSession>,
        config: &Config,
    ) -> Self {
        Self {
            remote,
            local,
            session,
            observer: Arc::new(NullObserver),
            max_retries: config.sync.max_retries,
            download_threads: config.sync.download_threads.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Plugs in a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// A token that cancels the engine at its next suspension point.
    /// Signal handlers hold a clone of this.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Failure::interrupt("Sync cancelled").into());
        }
        Ok(())
    }

    // ========================================================================
    // Outer retry loop
    // ========================================================================

    /// Runs the pipeline to completion, retrying recoverable failures after
    /// a session refresh.
    pub async fn run(&self) -> Result<SyncTotals> {
        let mut attempt: u32 = 0;

        loop {
            match self.run_once().await {
                Ok(totals) => return Ok(totals),
                Err(err) => {
                    if failure::is_interrupt(&err) || !failure::is_recoverable(&err) {
                        return Err(err);
                    }
                    if attempt >= self.max_retries {
                        return Err(err.context(format!(
                            "Retries exhausted after {} attempts",
                            attempt + 1
                        )));
                    }
                    attempt += 1;

                    let fallback;
                    let reported = match failure::classify(&err) {
                        Some(f) => f,
                        None => {
                            fallback = Failure::network(format!("{err:#}")).recoverable();
                            &fallback
                        }
                    };
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %reported,
                        "Recoverable failure, refreshing session and restarting pipeline"
                    );
                    self.observer.on_retry(attempt, self.max_retries, reported);

                    self.session
                        .refresh()
                        .await
                        .context("Session refresh failed during retry")?;
                }
            }
        }
    }

    // ========================================================================
    // One pipeline pass
    // ========================================================================

    async fn run_once(&self) -> Result<SyncTotals> {
        let start = Instant::now();
        let mut totals = SyncTotals::default();

        // Phase 1: fetch-and-load, in parallel.
        self.check_cancelled()?;
        self.observer.on_fetch_started();
        let (remote_snapshot, local_snapshot) =
            tokio::join!(self.remote.fetch_all(), self.local.read_snapshot());
        let remote_snapshot = remote_snapshot.context("Failed to fetch remote snapshot")?;
        let local_snapshot = local_snapshot.context("Failed to read local snapshot")?;

        self.observer.on_snapshots_loaded(
            (remote_snapshot.asset_count(), remote_snapshot.album_count()),
            (local_snapshot.asset_count(), local_snapshot.album_count()),
        );

        // Phase 2: diff.
        let plan = diff(&remote_snapshot, &local_snapshot);
        info!(
            assets_to_add = plan.assets_to_add.len(),
            assets_to_keep = plan.assets_to_keep.len(),
            assets_to_delete = plan.assets_to_delete.len(),
            albums_to_create = plan.albums_to_create.len(),
            albums_to_delete = plan.albums_to_delete.len(),
            "Change set computed"
        );
        self.observer.on_plan(&plan);

        // Phase 3a: asset downloads through the bounded pool, then
        // deletions (strictly after the additions).
        self.check_cancelled()?;
        let to_add: Vec<Asset> = plan
            .assets_to_add
            .iter()
            .filter_map(|fp| remote_snapshot.asset(fp).cloned())
            .collect();
        totals.assets_downloaded = self.write_assets(to_add).await?;

        let mut deferred: Vec<Fingerprint> = Vec::new();
        for fingerprint in &plan.assets_to_delete {
            self.check_cancelled()?;
            if self
                .local
                .delete_asset(fingerprint)
                .await
                .context("Failed to delete asset")?
            {
                totals.assets_deleted += 1;
                self.observer.on_asset_deleted(fingerprint);
            } else {
                // Still referenced by a link the album phase is about to
                // rewrite; try again afterwards.
                deferred.push(fingerprint.clone());
            }
        }

        // Phase 3b: albums. Stranded archives are relocated first so the
        // children-first deletions below find their parents empty.
        self.check_cancelled()?;
        let moved = self
            .local
            .move_stranded_archives(&local_snapshot, &remote_snapshot)
            .await
            .context("Failed to relocate stranded archives")?;
        for id in &moved {
            debug!(album = %id, "Archived album moved under _Archive");
        }

        for album in &plan.albums_to_create {
            self.check_cancelled()?;
            self.local
                .write_album(album, &remote_snapshot)
                .await
                .with_context(|| format!("Failed to write album '{}'", album.name()))?;
            totals.albums_written += 1;
            self.observer.on_album_written(album);
        }

        for id in &plan.albums_to_delete {
            self.check_cancelled()?;
            if let Some(album) = local_snapshot.album(id) {
                self.local
                    .delete_album(album, &local_snapshot)
                    .await
                    .with_context(|| format!("Failed to delete album '{}'", album.name()))?;
                totals.albums_deleted += 1;
            }
        }

        // Deletions blocked by stale links earlier are unblocked now that
        // the album links reflect the remote state.
        for fingerprint in deferred {
            if self
                .local
                .delete_asset(&fingerprint)
                .await
                .context("Failed to delete deferred asset")?
            {
                totals.assets_deleted += 1;
                self.observer.on_asset_deleted(&fingerprint);
            } else {
                totals.warnings += 1;
                self.observer.on_warning(
                    &Failure::library("Asset still referenced after album rewrite, keeping it")
                        .warning()
                        .with_context("fingerprint", &fingerprint),
                );
            }
        }

        self.local
            .verify()
            .await
            .context("Library verification failed after write phase")?;

        totals.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            downloaded = totals.assets_downloaded,
            deleted = totals.assets_deleted,
            albums_written = totals.albums_written,
            albums_deleted = totals.albums_deleted,
            duration_ms = totals.duration_ms,
            "Sync pass completed"
        );
        self.observer.on_complete(&totals);

        Ok(totals)
    }

    // ========================================================================
    // Download pool
    // ========================================================================

    /// Downloads `assets` through a producer/consumer queue with up to
    /// `download_threads` workers. Progress is emitted in completion order.
    ///
    /// The first failing worker cancels the phase; the remaining workers
    /// drain their in-flight download, delete their staging files and stop.
    async fn write_assets(&self, assets: Vec<Asset>) -> Result<u32> {
        let total = assets.len();
        if total == 0 {
            return Ok(0);
        }

        let phase = self.cancel.child_token();
        let (tx, rx) = mpsc::channel::<Asset>(self.download_threads);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut workers = tokio::task::JoinSet::new();
        for worker in 0..self.download_threads.min(total) {
            let rx = rx.clone();
            let remote = self.remote.clone();
            let local = self.local.clone();
            let observer = self.observer.clone();
            let phase = phase.clone();
            let completed = completed.clone();

            workers.spawn(async move {
                debug!(worker, "Download worker started");
                loop {
                    let asset = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = phase.cancelled() => None,
                            asset = rx.recv() => asset,
                        }
                    };
                    let Some(asset) = asset else { break };

                    let outcome = tokio::select! {
                        _ = phase.cancelled() => {
                            // Drain: drop the in-flight transfer and clean up.
                            local.abort_stage(&asset).await.ok();
                            break;
                        }
                        outcome = download_one(remote.as_ref(), local.as_ref(), &asset) => outcome,
                    };

                    match outcome {
                        Ok(()) => {
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            observer.on_asset_written(&asset, done, total);
                        }
                        Err(err) => {
                            local.abort_stage(&asset).await.ok();
                            phase.cancel();
                            return Err(err);
                        }
                    }
                }
                Ok(())
            });
        }

        // Producer: feed the queue; a closed channel means the phase was
        // cancelled and the workers are gone.
        for asset in assets {
            if tx.send(asset).await.is_err() {
                break;
            }
        }
        drop(tx);

        let mut first_error: Option<anyhow::Error> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(anyhow::anyhow!(join_err).context("Worker panicked"));
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        self.check_cancelled()?;

        Ok(completed.load(Ordering::SeqCst) as u32)
    }
}

/// Downloads one asset into its staging path and commits it, retrying
/// integrity mismatches within the per-asset budget.
async fn download_one(
    remote: &dyn RemoteLibrary,
    local: &dyn LocalLibrary,
    asset: &Asset,
) -> Result<()> {
    let stage = local.stage_path(asset);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match remote.download_asset(asset, &stage).await {
            Ok(()) => return local.commit_asset(asset).await,
            Err(err) => {
                let integrity = failure::classify(&err)
                    .map(|f| f.kind() == FailureKind::Sync && f.is_recoverable())
                    .unwrap_or(false);

                if integrity && attempts < INTEGRITY_RETRY_BUDGET {
                    warn!(
                        record = %asset.record_name(),
                        attempts,
                        "Integrity mismatch, retrying download"
                    );
                    local.abort_stage(asset).await.ok();
                    continue;
                }

                if integrity {
                    // Budget exhausted: the mismatch is now fatal.
                    return Err(Failure::sync("Integrity retries exhausted for asset")
                        .with_context("record", asset.record_name())
                        .with_context("attempts", attempts)
                        .with_source(err)
                        .into());
                }

                return Err(err);
            }
        }
    }
}
