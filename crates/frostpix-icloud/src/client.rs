//! Record-zone query client
//!
//! Implements the [`RemoteLibrary`] port against the photo service database:
//! paginated record queries for albums, assets and album membership, verified
//! streaming downloads, and the soft-delete used by the archive engine.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use frostpix_icloud::client::PhotosClient;
//! use frostpix_core::ports::RemoteLibrary;
//!
//! # async fn example(session: &frostpix_icloud::IcloudSession) -> anyhow::Result<()> {
//! let client = PhotosClient::from_session(session)?;
//! let snapshot = client.fetch_all().await?;
//! println!("{} assets remote", snapshot.asset_count());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use anyhow::Result;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use frostpix_core::domain::failure::Failure;
use frostpix_core::domain::newtypes::{FingerprintHasher, RecordName};
use frostpix_core::domain::{Album, Asset, LibrarySnapshot};
use frostpix_core::ports::remote_library::RemoteLibrary;

use crate::query::{
    self, QueryResponse, RawRecord, RECORD_TYPE_ALBUMS, RECORD_TYPE_ALBUM_ASSETS,
    RECORD_TYPE_ASSETS,
};
use crate::session::{map_service_status, IcloudSession, PRIMARY_ZONE};

/// Records requested per query page
const RESULTS_LIMIT: u32 = 200;

/// Record-zone client for the photo service database.
///
/// Shares the session's `reqwest::Client` so every request carries the
/// authenticated cookie and header state. Queries run against every zone
/// the session discovered, shared-library zones included.
pub struct PhotosClient {
    http: Client,
    base_url: String,
    zones: Vec<String>,
}

impl PhotosClient {
    /// Creates a client against the given database base URL, scoped to the
    /// primary zone only.
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            zones: vec![PRIMARY_ZONE.to_string()],
        }
    }

    /// Creates a client from a session in the `Ready` state, covering all
    /// zones the session discovered.
    pub fn from_session(session: &IcloudSession) -> Result<Self> {
        let mut client = Self::new(session.http().clone(), session.photos_base()?);
        let zones = session.zones();
        if !zones.is_empty() {
            client.zones = zones;
        }
        Ok(client)
    }

    /// Overrides the queried zones.
    #[must_use]
    pub fn with_zones(mut self, zones: Vec<String>) -> Self {
        self.zones = zones;
        self
    }

    async fn query_page(
        &self,
        zone: &str,
        record_type: &str,
        filter: Option<(&str, &str)>,
        marker: Option<&str>,
    ) -> Result<QueryResponse> {
        let mut body = serde_json::json!({
            "zoneID": { "zoneName": zone },
            "resultsLimit": RESULTS_LIMIT,
            "query": { "recordType": record_type },
        });
        if let Some((field, value)) = filter {
            body["query"]["filterBy"] = serde_json::json!([{
                "fieldName": field,
                "comparator": "EQUALS",
                "fieldValue": { "value": value },
            }]);
        }
        if let Some(marker) = marker {
            body["continuationMarker"] = serde_json::json!(marker);
        }

        let response = self
            .http
            .post(format!("{}/records/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Failure::network("Record query failed")
                    .recoverable()
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_service_status(status, "Record query").into());
        }

        response
            .json()
            .await
            .map_err(|e| Failure::sync("Malformed query response").with_source(e).into())
    }

    /// Runs a record query to exhaustion in one zone, following
    /// continuation markers.
    async fn query_all(
        &self,
        zone: &str,
        record_type: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .query_page(zone, record_type, filter, marker.as_deref())
                .await?;
            let got = page.records.len();
            records.extend(page.records);
            debug!(zone, record_type, page = got, total = records.len(), "Query page");

            match page.continuation_marker {
                Some(next) if got > 0 => marker = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }
}

#[async_trait::async_trait]
impl RemoteLibrary for PhotosClient {
    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<LibrarySnapshot> {
        let mut snapshot = LibrarySnapshot::new();

        for zone in &self.zones {
            // Albums first: they carry the parent map.
            let album_records = self.query_all(zone, RECORD_TYPE_ALBUMS, None).await?;
            let mut parsed = Vec::new();
            for record in &album_records {
                if let Some(album) = query::parse_album(record)? {
                    parsed.push(album);
                }
            }

            // The zone's full asset set (everything belongs to All-Photos
            // regardless of album membership).
            let asset_records = self.query_all(zone, RECORD_TYPE_ASSETS, None).await?;
            for record in &asset_records {
                for asset in query::parse_assets(record)? {
                    snapshot.insert_asset(asset);
                }
            }

            // Membership: one relation query per album, in the album's zone.
            for album in &parsed {
                if album.is_folder {
                    snapshot.insert_album(Album::folder(album.id, &album.name, album.parent)?);
                    continue;
                }

                let id_string = album.id.to_string();
                let member_records = self
                    .query_all(zone, RECORD_TYPE_ALBUM_ASSETS, Some(("parentId", &id_string)))
                    .await?;

                let mut members = Vec::new();
                for record in &member_records {
                    for asset in query::parse_assets(record)? {
                        members.push(asset.fingerprint().clone());
                        // Membership queries can be fresher than the master
                        // list; keep the snapshot consistent either way.
                        snapshot.insert_asset(asset);
                    }
                }

                snapshot
                    .insert_album(Album::album(album.id, &album.name, album.parent, members)?);
            }
        }

        snapshot
            .validate()
            .map_err(|e| Failure::sync("Remote snapshot is structurally invalid").with_source(e))?;

        info!(
            zones = self.zones.len(),
            assets = snapshot.asset_count(),
            albums = snapshot.album_count(),
            "Remote snapshot fetched"
        );
        Ok(snapshot)
    }

    #[instrument(skip(self, asset), fields(record = %asset.record_name(), dest = %dest.display()))]
    async fn download_asset(&self, asset: &Asset, dest: &Path) -> Result<()> {
        let url = asset.download_url().ok_or_else(|| {
            Failure::sync("Asset record carries no download URL")
                .with_context("record", asset.record_name())
        })?;

        let response = self.http.get(url).send().await.map_err(|e| {
            Failure::network("Asset download request failed")
                .recoverable()
                .with_source(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_service_status(status, "Asset download").into());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Failure::library("Cannot create staging file").with_source(e))?;

        let mut hasher = FingerprintHasher::new();
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Failure::network("Asset download stream interrupted")
                    .recoverable()
                    .with_source(e)
            })?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| Failure::library("Cannot write staging file").with_source(e))?;
        }

        file.flush()
            .await
            .map_err(|e| Failure::library("Cannot flush staging file").with_source(e))?;
        drop(file);

        // Integrity gate: both checks are recoverable so the engine can
        // retry the download within its per-asset budget.
        if received != asset.size() {
            return Err(Failure::sync("Downloaded size disagrees with declared length")
                .recoverable()
                .with_context("record", asset.record_name())
                .with_context("declared", asset.size())
                .with_context("received", received)
                .into());
        }

        let computed = hasher.finalize();
        if &computed != asset.fingerprint() {
            return Err(
                Failure::sync("Downloaded fingerprint disagrees with declared fingerprint")
                    .recoverable()
                    .with_context("record", asset.record_name())
                    .with_context("declared", asset.fingerprint())
                    .with_context("computed", computed)
                    .into(),
            );
        }

        debug!(bytes = received, "Asset downloaded and verified");
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn delete_assets(&self, records: &[RecordName]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let operations: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                serde_json::json!({
                    "operationType": "update",
                    "record": {
                        "recordName": record.as_str(),
                        "recordType": "CPLAsset",
                        "fields": { "isDeleted": { "value": 1 } },
                    },
                })
            })
            .collect();

        // Archival only ever deletes records the user owns, which live in
        // the primary zone; shared-library zones are read-only mirrors here.
        let body = serde_json::json!({
            "zoneID": { "zoneName": PRIMARY_ZONE },
            "atomic": false,
            "operations": operations,
        });

        let response = self
            .http
            .post(format!("{}/records/modify", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Failure::network("Record modify failed")
                    .recoverable()
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_service_status(status, "Record modify").into());
        }

        info!(count = records.len(), "Remote originals marked deleted");
        Ok(())
    }
}
