//! Integration tests for verified streaming downloads and remote deletion

use chrono::Utc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frostpix_core::domain::failure::{self, FailureKind};
use frostpix_core::domain::newtypes::{Fingerprint, RecordName};
use frostpix_core::domain::{Asset, AssetVariant};
use frostpix_core::ports::RemoteLibrary;
use frostpix_icloud::PhotosClient;

fn downloadable_asset(server: &MockServer, payload: &[u8], declared_size: u64) -> Asset {
    Asset::new(
        RecordName::new("rec-dl-1").unwrap(),
        Fingerprint::of_bytes(payload),
        declared_size,
        "IMG_0001.jpeg",
        Utc::now(),
        false,
        AssetVariant::Original,
        "jpeg",
        Some(format!("{}/blob/rec-dl-1", server.uri())),
    )
    .unwrap()
}

async fn mount_blob(server: &MockServer, payload: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/blob/rec-dl-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_verifies_and_writes() {
    let server = MockServer::start().await;
    let payload = b"jpeg bytes of a sunset";
    mount_blob(&server, payload).await;

    let asset = downloadable_asset(&server, payload, payload.len() as u64);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(".staged.jpeg.part");

    let client = PhotosClient::new(reqwest::Client::new(), server.uri());
    client.download_asset(&asset, &dest).await.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn test_download_rejects_length_mismatch() {
    let server = MockServer::start().await;
    let payload = b"short";
    mount_blob(&server, payload).await;

    // Declared one byte more than the body carries.
    let asset = downloadable_asset(&server, payload, payload.len() as u64 + 1);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(".staged.jpeg.part");

    let client = PhotosClient::new(reqwest::Client::new(), server.uri());
    let err = client.download_asset(&asset, &dest).await.unwrap_err();

    let f = failure::classify(&err).expect("typed failure expected");
    assert_eq!(f.kind(), FailureKind::Sync);
    assert!(f.is_recoverable());
    assert_eq!(f.context().get("received").unwrap(), "5");
}

#[tokio::test]
async fn test_download_rejects_fingerprint_mismatch() {
    let server = MockServer::start().await;
    mount_blob(&server, b"actual bytes").await;

    // Fingerprint declared over different content, same length.
    let asset = Asset::new(
        RecordName::new("rec-dl-1").unwrap(),
        Fingerprint::of_bytes(b"other  bytes"),
        12,
        "IMG_0001.jpeg",
        Utc::now(),
        false,
        AssetVariant::Original,
        "jpeg",
        Some(format!("{}/blob/rec-dl-1", server.uri())),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(".staged.jpeg.part");

    let client = PhotosClient::new(reqwest::Client::new(), server.uri());
    let err = client.download_asset(&asset, &dest).await.unwrap_err();

    let f = failure::classify(&err).expect("typed failure expected");
    assert!(f.is_recoverable());
    assert!(f.message().contains("fingerprint"));
}

#[tokio::test]
async fn test_download_without_url_is_fatal() {
    let asset = Asset::new(
        RecordName::new("rec-no-url").unwrap(),
        Fingerprint::of_bytes(b"x"),
        1,
        "IMG.jpeg",
        Utc::now(),
        false,
        AssetVariant::Original,
        "jpeg",
        None,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let client = PhotosClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
    let err = client
        .download_asset(&asset, &dir.path().join("x.part"))
        .await
        .unwrap_err();

    let f = failure::classify(&err).unwrap();
    assert!(!f.is_recoverable());
}

#[tokio::test]
async fn test_download_expired_token_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob/rec-dl-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let asset = downloadable_asset(&server, b"payload", 7);
    let dir = tempfile::tempdir().unwrap();

    let client = PhotosClient::new(reqwest::Client::new(), server.uri());
    let err = client
        .download_asset(&asset, &dir.path().join("x.part"))
        .await
        .unwrap_err();

    let f = failure::classify(&err).unwrap();
    assert_eq!(f.kind(), FailureKind::Auth);
    assert!(f.is_recoverable());
}

#[tokio::test]
async fn test_delete_assets_issues_soft_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/modify"))
        .and(body_partial_json(serde_json::json!({
            "operations": [{
                "operationType": "update",
                "record": {
                    "recordName": "rec-1",
                    "fields": { "isDeleted": { "value": 1 } },
                },
            }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PhotosClient::new(reqwest::Client::new(), server.uri());
    client
        .delete_assets(&[RecordName::new("rec-1").unwrap()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_assets_empty_is_noop() {
    // No server at all: an empty batch must not issue a request.
    let client = PhotosClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
    client.delete_assets(&[]).await.unwrap();
}
