//! Cron scheduler and signal handling for daemon mode
//!
//! The daemon loop sleeps until the next cron instant, runs one sync, and
//! repeats. Only one sync runs at a time (the loop is sequential; the
//! library lock guards against other processes). SIGINT/SIGTERM translate
//! into an interrupt-severity failure that unwinds the running phase and
//! releases the lock; the daemon exits only on such a signal.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use frostpix_core::domain::failure::{self, Failure};
use frostpix_core::ports::observer::SyncTotals;

/// Parsed cron schedule.
pub struct Scheduler {
    schedule: cron::Schedule,
    expression: String,
}

impl Scheduler {
    /// Parses a cron expression (seconds field included, `cron`-crate
    /// syntax).
    pub fn new(expression: &str) -> Result<Self> {
        let schedule = cron::Schedule::from_str(expression)
            .with_context(|| format!("Invalid cron expression: '{expression}'"))?;
        Ok(Self {
            schedule,
            expression: expression.to_string(),
        })
    }

    /// The original expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Time until the next matching instant after `now`; `None` when the
    /// schedule yields no future run.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.schedule
            .after(&now)
            .next()
            .and_then(|next| (next - now).to_std().ok())
    }
}

/// Resolves when SIGINT or SIGTERM is delivered, returning the signal name.
pub async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut interrupt =
            signal(SignalKind::interrupt()).context("Cannot install SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Cannot install SIGTERM handler")?;
        tokio::select! {
            _ = interrupt.recv() => Ok("SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Cannot install interrupt handler")?;
        Ok("interrupt")
    }
}

/// Runs the daemon loop: sleep to the next cron instant, sync, repeat.
///
/// Sync failures are logged and the loop continues; an interrupt (from the
/// cancellation token or from inside the sync) ends the loop with an
/// interrupt failure so the caller can release the lock and exit.
pub async fn run_daemon<F, Fut>(
    scheduler: &Scheduler,
    cancel: CancellationToken,
    mut sync_fn: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<SyncTotals>>,
{
    info!(schedule = %scheduler.expression(), "Daemon started");

    loop {
        let Some(delay) = scheduler.next_delay(Utc::now()) else {
            return Err(Failure::library("Cron schedule yields no future run")
                .with_context("schedule", scheduler.expression())
                .into());
        };
        info!(seconds = delay.as_secs(), "Next sync scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Failure::interrupt("Daemon shutdown requested").into());
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match sync_fn().await {
            Ok(totals) => info!(
                downloaded = totals.assets_downloaded,
                deleted = totals.assets_deleted,
                duration_ms = totals.duration_ms,
                "Scheduled sync completed"
            ),
            Err(err) if failure::is_interrupt(&err) => return Err(err),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Scheduled sync failed, daemon continues");
            }
        }
    }
}
