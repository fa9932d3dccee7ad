//! Integration tests for record-zone queries
//!
//! Verifies end-to-end behavior of `fetch_all` against a wiremock-based
//! photo database: snapshot assembly with the parent map and membership,
//! pagination via continuation markers, and error classification.

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frostpix_core::domain::failure::{self, FailureKind};
use frostpix_core::domain::newtypes::{AlbumId, Fingerprint};
use frostpix_core::domain::AlbumKind;
use frostpix_core::ports::RemoteLibrary;
use frostpix_icloud::PhotosClient;

use crate::common;

fn client_for(server: &MockServer) -> PhotosClient {
    PhotosClient::new(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn test_fetch_all_builds_snapshot() {
    let server = MockServer::start().await;

    let folder_id = AlbumId::new();
    let album_id = AlbumId::new();

    common::mount_query(
        &server,
        "CPLAlbumByPositionLive",
        serde_json::json!([
            common::album_record(&folder_id, "Travel", None, true),
            common::album_record(&album_id, "Rome", Some(&folder_id), false),
        ]),
    )
    .await;

    common::mount_query(
        &server,
        "CPLAssetAndMasterByAddedDate",
        serde_json::json!([
            common::asset_record("rec-1", "IMG_0001.JPG", b"one", false, "https://x/1"),
            common::asset_record("rec-2", "IMG_0002.JPG", b"two", true, "https://x/2"),
        ]),
    )
    .await;

    common::mount_query(
        &server,
        "CPLContainerRelationLiveByAssetDate",
        serde_json::json!([
            common::asset_record("rec-1", "IMG_0001.JPG", b"one", false, "https://x/1"),
        ]),
    )
    .await;

    let snapshot = client_for(&server).fetch_all().await.unwrap();

    assert_eq!(snapshot.asset_count(), 2);
    assert_eq!(snapshot.album_count(), 2);

    let folder = snapshot.album(&folder_id).unwrap();
    assert_eq!(folder.kind(), AlbumKind::Folder);

    let album = snapshot.album(&album_id).unwrap();
    assert_eq!(album.kind(), AlbumKind::Album);
    assert_eq!(album.parent(), Some(&folder_id));
    assert_eq!(album.members(), &[Fingerprint::of_bytes(b"one")]);

    let favorite = snapshot.asset(&Fingerprint::of_bytes(b"two")).unwrap();
    assert!(favorite.is_favorite());
}

#[tokio::test]
async fn test_fetch_all_follows_continuation_markers() {
    let server = MockServer::start().await;

    common::mount_query(&server, "CPLAlbumByPositionLive", serde_json::json!([])).await;

    // Page 1 answers with a continuation marker; page 2 (matched by the
    // marker echoed in the request body) is the last page.
    Mock::given(method("POST"))
        .and(path("/records/query"))
        .and(body_partial_json(serde_json::json!({
            "query": { "recordType": "CPLAssetAndMasterByAddedDate" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [
                common::asset_record("rec-1", "a.jpeg", b"page-one", false, "https://x/1"),
            ],
            "continuationMarker": "page-2",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/records/query"))
        .and(body_partial_json(serde_json::json!({
            "continuationMarker": "page-2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [
                common::asset_record("rec-2", "b.jpeg", b"page-two", false, "https://x/2"),
            ],
        })))
        .mount(&server)
        .await;

    let snapshot = client_for(&server).fetch_all().await.unwrap();

    assert_eq!(snapshot.asset_count(), 2);
    assert!(snapshot.asset(&Fingerprint::of_bytes(b"page-one")).is_some());
    assert!(snapshot.asset(&Fingerprint::of_bytes(b"page-two")).is_some());
}

#[tokio::test]
async fn test_fetch_all_merges_all_zones() {
    let server = MockServer::start().await;
    let shared_album = AlbumId::new();

    // Primary zone: one loose asset, no albums.
    common::mount_zone_query(
        &server,
        "PrimarySync",
        "CPLAlbumByPositionLive",
        serde_json::json!([]),
    )
    .await;
    common::mount_zone_query(
        &server,
        "PrimarySync",
        "CPLAssetAndMasterByAddedDate",
        serde_json::json!([
            common::asset_record("rec-own", "IMG_0001.JPG", b"own", false, "https://x/own"),
        ]),
    )
    .await;

    // Shared-library zone: one album with one member.
    common::mount_zone_query(
        &server,
        "SharedSync",
        "CPLAlbumByPositionLive",
        serde_json::json!([common::album_record(&shared_album, "Family", None, false)]),
    )
    .await;
    common::mount_zone_query(
        &server,
        "SharedSync",
        "CPLAssetAndMasterByAddedDate",
        serde_json::json!([
            common::asset_record("rec-shared", "IMG_0002.JPG", b"shared", false, "https://x/sh"),
        ]),
    )
    .await;
    common::mount_zone_query(
        &server,
        "SharedSync",
        "CPLContainerRelationLiveByAssetDate",
        serde_json::json!([
            common::asset_record("rec-shared", "IMG_0002.JPG", b"shared", false, "https://x/sh"),
        ]),
    )
    .await;

    let client = client_for(&server)
        .with_zones(vec!["PrimarySync".to_string(), "SharedSync".to_string()]);
    let snapshot = client.fetch_all().await.unwrap();

    assert_eq!(snapshot.asset_count(), 2);
    assert!(snapshot.asset(&Fingerprint::of_bytes(b"own")).is_some());
    assert!(snapshot.asset(&Fingerprint::of_bytes(b"shared")).is_some());

    let album = snapshot.album(&shared_album).unwrap();
    assert_eq!(album.members(), &[Fingerprint::of_bytes(b"shared")]);
}

#[tokio::test]
async fn test_fetch_all_empty_library() {
    let server = MockServer::start().await;
    common::mount_query(&server, "CPLAlbumByPositionLive", serde_json::json!([])).await;
    common::mount_query(
        &server,
        "CPLAssetAndMasterByAddedDate",
        serde_json::json!([]),
    )
    .await;

    let snapshot = client_for(&server).fetch_all().await.unwrap();
    assert_eq!(snapshot.asset_count(), 0);
    assert_eq!(snapshot.album_count(), 0);
}

#[tokio::test]
async fn test_query_rate_limit_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/query"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_all().await.unwrap_err();
    assert!(failure::is_recoverable(&err));
}

#[tokio::test]
async fn test_query_server_error_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/query"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_all().await.unwrap_err();
    assert!(failure::is_recoverable(&err));
}

#[tokio::test]
async fn test_malformed_record_is_fatal() {
    let server = MockServer::start().await;
    // An album record without a name field.
    common::mount_query(
        &server,
        "CPLAlbumByPositionLive",
        serde_json::json!([{
            "recordName": AlbumId::new().to_string(),
            "recordType": "CPLAlbumByPositionLive",
            "fields": {},
        }]),
    )
    .await;

    let err = client_for(&server).fetch_all().await.unwrap_err();
    let f = failure::classify(&err).expect("typed failure expected");
    assert_eq!(f.kind(), FailureKind::Sync);
    assert!(!f.is_recoverable());
}
