//! Sync, archive and lifecycle engines for frostpix
//!
//! - [`library`] - the on-disk library (`FsLibrary`): filesystem-as-state,
//!   content-addressed asset files plus symlinked album membership
//! - [`engine`] - the differential sync engine: fetch → diff → write with a
//!   bounded download pool and a refresh-and-retry loop
//! - [`archive`] - freezing subtrees and optional remote deletion
//! - [`lock`] - the process-singleton library lock
//! - [`scheduler`] - cron-driven daemon loop and signal handling

pub mod archive;
pub mod engine;
pub mod library;
pub mod lock;
pub mod scheduler;

pub use archive::ArchiveEngine;
pub use engine::SyncEngine;
pub use library::FsLibrary;
pub use lock::LibraryLock;
pub use scheduler::Scheduler;
