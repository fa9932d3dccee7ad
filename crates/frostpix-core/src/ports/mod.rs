//! Port definitions (trait interfaces for adapters)
//!
//! Ports use `anyhow::Result` at the boundary; adapters attach a typed
//! [`Failure`](crate::domain::Failure) to the chain so the engines can route
//! errors without string matching.

pub mod local_library;
pub mod observer;
pub mod remote_library;

pub use local_library::LocalLibrary;
pub use observer::{
    ArchiveObserver, AuthObserver, AuthStage, NullObserver, SyncObserver, SyncTotals,
};
pub use remote_library::{AuthSession, RemoteLibrary};
