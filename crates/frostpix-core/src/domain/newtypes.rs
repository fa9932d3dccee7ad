//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Fingerprint
// ============================================================================

/// Content fingerprint of an asset.
///
/// The fingerprint is the deduplication key of the library: two assets with
/// equal fingerprints are byte-identical and interchangeable. The service
/// declares a fingerprint for every asset; frostpix recomputes it as the
/// SHA-256 of the asset bytes during download and refuses mismatches.
///
/// The URL-safe base64 rendering (no padding) doubles as the filename stem
/// under `_All-Photos`, so it must round-trip through [`encode`](Self::encode)
/// and [`decode`](Self::decode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Wraps raw fingerprint bytes as declared by the service.
    pub fn from_raw(bytes: Vec<u8>) -> Result<Self, DomainError> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidFingerprint("empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Computes the fingerprint of a complete byte slice.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).to_vec())
    }

    /// Renders the filename-safe encoding (URL-safe base64, no padding).
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Parses a filename stem back into a fingerprint.
    pub fn decode(stem: &str) -> Result<Self, DomainError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(stem)
            .map_err(|e| DomainError::InvalidFingerprint(format!("{stem}: {e}")))?;
        Self::from_raw(bytes)
    }

    /// Returns the raw fingerprint bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Incremental fingerprint computation for streamed downloads.
///
/// Feed chunks as they arrive and call [`finalize`](Self::finalize) once the
/// stream ends; the result must match the fingerprint the service declared.
#[derive(Debug, Default)]
pub struct FingerprintHasher(Sha256);

impl FingerprintHasher {
    /// Creates a fresh hasher.
    #[must_use]
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Feeds a chunk of asset bytes.
    pub fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    /// Consumes the hasher and returns the computed fingerprint.
    #[must_use]
    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.0.finalize().to_vec())
    }
}

// ============================================================================
// AlbumId
// ============================================================================

/// Identifier for Album entities (the service-assigned UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(Uuid);

impl AlbumId {
    /// Create a new random AlbumId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an AlbumId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlbumId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AlbumId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlbumId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid AlbumId: {e}")))
    }
}

impl From<Uuid> for AlbumId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// RecordName
// ============================================================================

/// Stable remote identifier of an asset record.
///
/// Opaque to frostpix; used verbatim when addressing the record upstream
/// (e.g. for remote deletion during archival).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordName(String);

impl RecordName {
    /// Wraps a service record name, rejecting empty values.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidRecordName("empty".to_string()));
        }
        Ok(Self(name))
    }

    /// Returns the record name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
