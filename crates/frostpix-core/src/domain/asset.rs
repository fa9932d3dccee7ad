//! Asset domain entity
//!
//! An asset is a single media artifact: the original upload or the edited
//! rendition of it. Both are full-fledged assets with their own fingerprint
//! and their own file under `_All-Photos`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{Fingerprint, RecordName};

/// Whether an asset is the original upload or an edited rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetVariant {
    /// The bytes as originally uploaded
    Original,
    /// The current edited rendition
    Edited,
}

impl std::fmt::Display for AssetVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetVariant::Original => write!(f, "original"),
            AssetVariant::Edited => write!(f, "edited"),
        }
    }
}

/// A single media artifact known to the library.
///
/// Assets are keyed by fingerprint everywhere; the record name is only needed
/// when addressing the record upstream. The optional download URL is a signed,
/// short-lived link present only on remote snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable remote identifier
    record_name: RecordName,
    /// Content fingerprint (deduplication key and filename stem)
    fingerprint: Fingerprint,
    /// Declared byte length
    size: u64,
    /// Original filename as uploaded (without a path)
    original_name: String,
    /// Remote modification timestamp
    modified: DateTime<Utc>,
    /// Favorite flag (blocks remote deletion during archival)
    favorite: bool,
    /// Original or edited rendition
    variant: AssetVariant,
    /// File extension without the leading dot
    extension: String,
    /// Signed download URL, present on remote snapshots only
    download_url: Option<String>,
}

impl Asset {
    /// Creates a new Asset, validating the name and extension.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record_name: RecordName,
        fingerprint: Fingerprint,
        size: u64,
        original_name: impl Into<String>,
        modified: DateTime<Utc>,
        favorite: bool,
        variant: AssetVariant,
        extension: impl Into<String>,
        download_url: Option<String>,
    ) -> Result<Self, DomainError> {
        let original_name = original_name.into();
        if original_name.is_empty() || original_name.contains('/') {
            return Err(DomainError::InvalidName(original_name));
        }
        let extension = extension.into();
        if extension.is_empty() || extension.contains('/') || extension.contains('.') {
            return Err(DomainError::InvalidExtension(extension));
        }
        Ok(Self {
            record_name,
            fingerprint,
            size,
            original_name,
            modified,
            favorite,
            variant,
            extension,
            download_url,
        })
    }

    // --- Getters ---

    /// Returns the stable remote identifier
    pub fn record_name(&self) -> &RecordName {
        &self.record_name
    }

    /// Returns the content fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the declared byte length
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the original filename
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Returns the remote modification timestamp
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Returns true if the asset is marked as a favorite
    pub fn is_favorite(&self) -> bool {
        self.favorite
    }

    /// Returns whether this is the original or the edited rendition
    pub fn variant(&self) -> AssetVariant {
        self.variant
    }

    /// Returns the file extension (without the leading dot)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the signed download URL, if present
    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    // --- Derived names ---

    /// The unique physical filename under `_All-Photos`:
    /// `<fingerprint>.<ext>`.
    #[must_use]
    pub fn disk_name(&self) -> String {
        format!("{}.{}", self.fingerprint.encode(), self.extension)
    }

    /// The symlink name inside album directories.
    ///
    /// Edited renditions get an `-edited` stem suffix so both variants can
    /// coexist next to each other under the original name.
    #[must_use]
    pub fn link_name(&self) -> String {
        match self.variant {
            AssetVariant::Original => self.original_name.clone(),
            AssetVariant::Edited => match self.original_name.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}-edited.{ext}"),
                None => format!("{}-edited", self.original_name),
            },
        }
    }
}
