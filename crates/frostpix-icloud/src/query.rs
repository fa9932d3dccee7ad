//! Record-zone wire DTOs and record parsing
//!
//! The record-zone protocol is reverse-engineered and may drift; everything
//! in this module is private to the adapter and reachable by the engines
//! only through the [`RemoteLibrary`](frostpix_core::ports::RemoteLibrary)
//! port. Record fields arrive as `{ "value": ..., "type": ... }` envelopes;
//! string payloads that can carry arbitrary user text (album names, file
//! names) are base64-encoded on the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use frostpix_core::domain::failure::Failure;
use frostpix_core::domain::newtypes::{AlbumId, Fingerprint, RecordName};
use frostpix_core::domain::{Asset, AssetVariant};

/// Record type listing every album with its position and parent.
pub const RECORD_TYPE_ALBUMS: &str = "CPLAlbumByPositionLive";

/// Record type listing every asset/master pair in the library.
pub const RECORD_TYPE_ASSETS: &str = "CPLAssetAndMasterByAddedDate";

/// Record type listing the assets contained in one album (filtered by
/// `parentId`).
pub const RECORD_TYPE_ALBUM_ASSETS: &str = "CPLContainerRelationLiveByAssetDate";

/// `albumType` value marking a folder (container of albums).
const ALBUM_TYPE_FOLDER: i64 = 3;

// ============================================================================
// Response envelopes
// ============================================================================

/// One page of a record query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    /// Records on this page
    #[serde(default)]
    pub records: Vec<RawRecord>,
    /// Opaque marker for the next page; absent on the last page
    #[serde(rename = "continuationMarker")]
    pub continuation_marker: Option<String>,
}

/// An unparsed record straight off the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    /// Stable record identifier
    #[serde(rename = "recordName")]
    pub record_name: String,
    /// Record type tag
    #[serde(rename = "recordType")]
    pub record_type: String,
    /// Field envelopes keyed by field name
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Value of a resource field: a signed download link plus the declared size.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceValue {
    /// Signed, short-lived download URL
    #[serde(rename = "downloadURL")]
    pub download_url: Option<String>,
    /// Declared byte length
    pub size: Option<u64>,
}

impl RawRecord {
    fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name).and_then(|field| field.get("value"))
    }

    fn string_field(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(|v| v.as_str())
    }

    fn int_field(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(|v| v.as_i64())
    }

    /// Decodes a base64-wrapped string field (album names, file names).
    fn encoded_string_field(&self, name: &str) -> Option<String> {
        let encoded = self.string_field(name)?;
        let bytes = STANDARD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn resource_field(&self, name: &str) -> Option<ResourceValue> {
        let value = self.value(name)?;
        serde_json::from_value(value.clone()).ok()
    }
}

// ============================================================================
// Album parsing
// ============================================================================

/// An album record before forest assembly.
#[derive(Debug, Clone)]
pub struct AlbumRecord {
    /// Album UUID
    pub id: AlbumId,
    /// Decoded human-readable name
    pub name: String,
    /// Parent album UUID, if nested
    pub parent: Option<AlbumId>,
    /// True for folders (containers of albums)
    pub is_folder: bool,
}

/// Parses an album record. Returns `None` for tombstoned albums.
pub fn parse_album(record: &RawRecord) -> anyhow::Result<Option<AlbumRecord>> {
    if record.int_field("isDeleted").unwrap_or(0) == 1 {
        return Ok(None);
    }

    let id = record
        .record_name
        .parse::<AlbumId>()
        .map_err(|e| malformed(record, "recordName").with_source(e))?;

    let name = record
        .encoded_string_field("albumNameEnc")
        .ok_or_else(|| malformed(record, "albumNameEnc"))?;

    let parent = match record.string_field("parentId") {
        Some(p) if !p.is_empty() => Some(
            p.parse::<AlbumId>()
                .map_err(|e| malformed(record, "parentId").with_source(e))?,
        ),
        _ => None,
    };

    let is_folder = record.int_field("albumType").unwrap_or(0) == ALBUM_TYPE_FOLDER;

    Ok(Some(AlbumRecord {
        id,
        name,
        parent,
        is_folder,
    }))
}

// ============================================================================
// Asset parsing
// ============================================================================

/// Parses an asset record into its assets: the original, plus the edited
/// rendition when one exists. Returns an empty vector for tombstones.
pub fn parse_assets(record: &RawRecord) -> anyhow::Result<Vec<Asset>> {
    if record.int_field("isDeleted").unwrap_or(0) == 1 {
        return Ok(Vec::new());
    }

    let record_name = RecordName::new(&record.record_name)
        .map_err(|e| malformed(record, "recordName").with_source(e))?;

    let filename = record
        .encoded_string_field("filenameEnc")
        .ok_or_else(|| malformed(record, "filenameEnc"))?;

    let modified = record
        .int_field("assetDate")
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let favorite = record.int_field("isFavorite").unwrap_or(0) == 1;

    let variants = [
        (
            AssetVariant::Original,
            "resOriginalRes",
            "resOriginalFingerprint",
            "resOriginalFileType",
        ),
        (
            AssetVariant::Edited,
            "resEditedRes",
            "resEditedFingerprint",
            "resEditedFileType",
        ),
    ];

    let mut assets = Vec::new();
    for (variant, res_key, fp_key, type_key) in variants {
        let Some(resource) = record.resource_field(res_key) else {
            continue;
        };

        let fingerprint_b64 = record
            .string_field(fp_key)
            .ok_or_else(|| malformed(record, fp_key))?;
        let fingerprint_bytes = STANDARD
            .decode(fingerprint_b64)
            .map_err(|e| malformed(record, fp_key).with_source(e))?;
        let fingerprint = Fingerprint::from_raw(fingerprint_bytes)
            .map_err(|e| malformed(record, fp_key).with_source(e))?;

        let size = resource.size.ok_or_else(|| malformed(record, res_key))?;
        let extension = extension_for(record.string_field(type_key), &filename);

        let asset = Asset::new(
            record_name.clone(),
            fingerprint,
            size,
            filename.clone(),
            modified,
            favorite,
            variant,
            extension,
            resource.download_url,
        )
        .map_err(|e| malformed(record, "filenameEnc").with_source(e))?;

        assets.push(asset);
    }

    if assets.is_empty() {
        return Err(malformed(record, "resOriginalRes").into());
    }

    Ok(assets)
}

/// Maps a uniform type identifier to a filename extension, falling back to
/// the extension of the original filename.
fn extension_for(file_type: Option<&str>, filename: &str) -> String {
    match file_type {
        Some("public.jpeg") => "jpeg".to_string(),
        Some("public.png") => "png".to_string(),
        Some("public.heic") => "heic".to_string(),
        Some("com.compuserve.gif") => "gif".to_string(),
        Some("com.apple.quicktime-movie") => "mov".to_string(),
        Some("public.mpeg-4") => "mp4".to_string(),
        _ => filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string()),
    }
}

/// Malformed records are fatal: retrying cannot fix them and silently
/// skipping would make the sync lie about completeness.
fn malformed(record: &RawRecord, field: &str) -> Failure {
    Failure::sync("Malformed record from photo service")
        .with_context("record", &record.record_name)
        .with_context("record_type", &record.record_type)
        .with_context("field", field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_value(value: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "value": value })
    }

    fn album_record(name: &str, album_type: i64) -> RawRecord {
        let id = AlbumId::new();
        let mut fields = serde_json::Map::new();
        fields.insert(
            "albumNameEnc".to_string(),
            field_value(serde_json::json!(STANDARD.encode(name))),
        );
        fields.insert(
            "albumType".to_string(),
            field_value(serde_json::json!(album_type)),
        );
        RawRecord {
            record_name: id.to_string(),
            record_type: RECORD_TYPE_ALBUMS.to_string(),
            fields,
        }
    }

    fn asset_record(filename: &str, payload: &[u8]) -> RawRecord {
        let mut fields = serde_json::Map::new();
        fields.insert(
            "filenameEnc".to_string(),
            field_value(serde_json::json!(STANDARD.encode(filename))),
        );
        fields.insert(
            "assetDate".to_string(),
            field_value(serde_json::json!(1_700_000_000_000_i64)),
        );
        fields.insert("isFavorite".to_string(), field_value(serde_json::json!(0)));
        fields.insert(
            "resOriginalRes".to_string(),
            field_value(serde_json::json!({
                "downloadURL": "https://cvws.example.com/blob?o=token",
                "size": payload.len(),
            })),
        );
        fields.insert(
            "resOriginalFingerprint".to_string(),
            field_value(serde_json::json!(
                STANDARD.encode(Fingerprint::of_bytes(payload).as_bytes())
            )),
        );
        fields.insert(
            "resOriginalFileType".to_string(),
            field_value(serde_json::json!("public.jpeg")),
        );
        RawRecord {
            record_name: "asset-record-001".to_string(),
            record_type: RECORD_TYPE_ASSETS.to_string(),
            fields,
        }
    }

    #[test]
    fn test_parse_album() {
        let record = album_record("Holidays 2025", 0);
        let album = parse_album(&record).unwrap().unwrap();
        assert_eq!(album.name, "Holidays 2025");
        assert!(!album.is_folder);
        assert!(album.parent.is_none());
    }

    #[test]
    fn test_parse_folder() {
        let record = album_record("Travel", ALBUM_TYPE_FOLDER);
        let album = parse_album(&record).unwrap().unwrap();
        assert!(album.is_folder);
    }

    #[test]
    fn test_parse_deleted_album_is_skipped() {
        let mut record = album_record("Ghost", 0);
        record
            .fields
            .insert("isDeleted".to_string(), field_value(serde_json::json!(1)));
        assert!(parse_album(&record).unwrap().is_none());
    }

    #[test]
    fn test_parse_album_without_name_is_malformed() {
        let mut record = album_record("x", 0);
        record.fields.remove("albumNameEnc");
        assert!(parse_album(&record).is_err());
    }

    #[test]
    fn test_parse_asset_original_only() {
        let record = asset_record("IMG_0042.JPG", b"jpeg bytes");
        let assets = parse_assets(&record).unwrap();
        assert_eq!(assets.len(), 1);
        let asset = &assets[0];
        assert_eq!(asset.original_name(), "IMG_0042.JPG");
        assert_eq!(asset.extension(), "jpeg");
        assert_eq!(asset.size(), 10);
        assert_eq!(asset.fingerprint(), &Fingerprint::of_bytes(b"jpeg bytes"));
        assert_eq!(asset.variant(), AssetVariant::Original);
    }

    #[test]
    fn test_parse_asset_with_edited_rendition() {
        let mut record = asset_record("IMG_0042.JPG", b"jpeg bytes");
        record.fields.insert(
            "resEditedRes".to_string(),
            field_value(serde_json::json!({
                "downloadURL": "https://cvws.example.com/blob-edited",
                "size": 5,
            })),
        );
        record.fields.insert(
            "resEditedFingerprint".to_string(),
            field_value(serde_json::json!(
                STANDARD.encode(Fingerprint::of_bytes(b"edits").as_bytes())
            )),
        );
        record.fields.insert(
            "resEditedFileType".to_string(),
            field_value(serde_json::json!("public.jpeg")),
        );

        let assets = parse_assets(&record).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].variant(), AssetVariant::Edited);
        assert_ne!(assets[0].fingerprint(), assets[1].fingerprint());
    }

    #[test]
    fn test_parse_asset_without_resource_is_malformed() {
        let mut record = asset_record("IMG.jpeg", b"x");
        record.fields.remove("resOriginalRes");
        assert!(parse_assets(&record).is_err());
    }

    #[test]
    fn test_parse_deleted_asset_is_skipped() {
        let mut record = asset_record("IMG.jpeg", b"x");
        record
            .fields
            .insert("isDeleted".to_string(), field_value(serde_json::json!(1)));
        assert!(parse_assets(&record).unwrap().is_empty());
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for(Some("public.heic"), "a.HEIC"), "heic");
        assert_eq!(extension_for(Some("public.mpeg-4"), "clip.mp4"), "mp4");
        assert_eq!(extension_for(None, "photo.JPG"), "jpg");
        assert_eq!(extension_for(Some("public.unknown"), "noext"), "bin");
    }
}
