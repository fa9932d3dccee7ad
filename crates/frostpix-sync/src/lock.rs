//! Process-singleton library lock
//!
//! A single file holding the PID of the process currently mutating the data
//! directory. Acquisition creates the file exclusively; a present lock is a
//! fatal conflict unless `force` takes it over. Release (explicit or on
//! drop) removes the file only if its content still matches this process's
//! PID, so a crashed run taken over by another process is never unlocked by
//! the stale owner.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use frostpix_core::domain::failure::Failure;

/// File name of the lock inside the data directory.
pub const LOCK_FILE: &str = ".library.lock";

/// Held library lock; releases on drop.
#[derive(Debug)]
pub struct LibraryLock {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl LibraryLock {
    /// Acquires the lock inside `data_dir`.
    ///
    /// With `force`, a present lock is overwritten after a warning;
    /// otherwise the owning PID is reported in a fatal failure.
    pub fn acquire(data_dir: &Path, force: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Failure::library("Cannot create data directory").with_source(e))?;

        let path = data_dir.join(LOCK_FILE);
        let pid = std::process::id();

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                write!(file, "{pid}")
                    .map_err(|e| Failure::library("Cannot write library lock").with_source(e))?;
                debug!(pid, lock = %path.display(), "Library lock acquired");
                Ok(Self {
                    path,
                    pid,
                    released: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = std::fs::read_to_string(&path)
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !force {
                    return Err(Failure::library(format!(
                        "Library is locked by process {owner}; pass --force to take over"
                    ))
                    .with_context("owner_pid", &owner)
                    .with_context("lock", path.display())
                    .into());
                }

                warn!(owner_pid = %owner, "Taking over existing library lock");
                std::fs::write(&path, pid.to_string())
                    .map_err(|e| Failure::library("Cannot take over library lock").with_source(e))?;
                Ok(Self {
                    path,
                    pid,
                    released: false,
                })
            }
            Err(e) => Err(Failure::library("Cannot create library lock")
                .with_context("lock", path.display())
                .with_source(e)
                .into()),
        }
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock if this process still owns it. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim() == self.pid.to_string() => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!(error = %e, "Failed to remove library lock");
                } else {
                    info!(lock = %self.path.display(), "Library lock released");
                }
            }
            Ok(content) => {
                // Someone else took the lock over; it is theirs to remove.
                debug!(owner = %content.trim(), "Lock no longer ours, leaving it");
            }
            Err(_) => {}
        }
    }
}

impl Drop for LibraryLock {
    fn drop(&mut self) {
        self.release();
    }
}
