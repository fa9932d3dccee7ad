//! Domain entities and pure logic
//!
//! Everything in this module is I/O-free. The filesystem and the photo
//! service are reached only through the traits in [`crate::ports`].

pub mod album;
pub mod asset;
pub mod diff;
pub mod errors;
pub mod failure;
pub mod newtypes;
pub mod snapshot;

pub use album::{Album, AlbumKind};
pub use asset::{Asset, AssetVariant};
pub use diff::{diff, SyncPlan};
pub use errors::DomainError;
pub use failure::{Failure, FailureKind, Severity};
pub use newtypes::{AlbumId, Fingerprint, FingerprintHasher, RecordName};
pub use snapshot::LibrarySnapshot;
