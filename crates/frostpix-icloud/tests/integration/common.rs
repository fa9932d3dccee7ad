//! Shared test helpers for the service integration tests
//!
//! Provides wiremock-based mock endpoints for the identity service
//! (sign-in, MFA verification), the setup service (accountLogin) and the
//! photo database (record queries), plus record fixture builders matching
//! the wire format the adapter parses.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frostpix_core::config::{Config, Secret};
use frostpix_core::domain::newtypes::{AlbumId, Fingerprint};
use frostpix_icloud::IcloudSession;

/// Path of the photo database under the mock server (what `accountLogin`
/// resolves to once the `/db` service URL is expanded).
pub const DB_PATH: &str = "/db/database/1/com.apple.photos.cloud/production/private";

/// Builds a config with test credentials rooted in `data_dir`.
pub fn test_config(data_dir: &Path, mfa_port: u16) -> Config {
    let mut config = Config::default();
    config.account.username = Some("tester@example.com".to_string());
    config.account.password = Some(Secret::new("correct-horse"));
    config.library.data_dir = data_dir.to_path_buf();
    config.mfa.port = mfa_port;
    config
}

/// Creates a session whose identity and setup endpoints point at the mock
/// server (`/auth` and `/setup` prefixes).
pub fn session_against(server: &MockServer, config: &Config) -> IcloudSession {
    IcloudSession::new(config)
        .expect("session construction failed")
        .with_endpoints(
            format!("{}/auth", server.uri()),
            format!("{}/setup", server.uri()),
        )
}

/// Mounts a sign-in endpoint that accepts the credentials outright
/// (the trust-token path).
pub async fn mount_signin_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("X-Apple-Session-Token", "session-token-001")
                .append_header("X-Apple-ID-Session-Id", "sid-001")
                .append_header("scnt", "scnt-001")
                .set_body_json(serde_json::json!({ "authType": "non-sa" })),
        )
        .mount(server)
        .await;
}

/// Mounts a sign-in endpoint that demands a second factor, offering the
/// given trusted phone numbers.
pub async fn mount_signin_mfa(server: &MockServer, phones: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(
            ResponseTemplate::new(409)
                .append_header("X-Apple-ID-Session-Id", "sid-001")
                .append_header("scnt", "scnt-001")
                .set_body_json(serde_json::json!({
                    "authType": "hsa2",
                    "trustedPhoneNumbers": phones,
                })),
        )
        .mount(server)
        .await;
}

/// Mounts the setup service: `accountLogin` resolving the photo database to
/// `{server}/db`, and the zone listing with the primary zone present.
pub async fn mount_setup(server: &MockServer) {
    mount_setup_with_zones(server, &["PrimarySync"]).await;
}

/// Mounts the setup service with a custom zone listing.
pub async fn mount_setup_with_zones(server: &MockServer, zones: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/setup/accountLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "webservices": {
                "ckdatabasews": {
                    "url": format!("{}/db", server.uri()),
                    "status": "active"
                }
            }
        })))
        .mount(server)
        .await;

    let listing: Vec<serde_json::Value> = zones
        .iter()
        .map(|name| serde_json::json!({ "zoneID": { "zoneName": name } }))
        .collect();
    Mock::given(method("POST"))
        .and(path(format!("{DB_PATH}/zones/list")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "zones": listing
        })))
        .mount(server)
        .await;
}

/// Mounts a single-page query response for the given record type
/// (against a client created with `PhotosClient::new(_, server.uri())`).
pub async fn mount_query(server: &MockServer, record_type: &str, records: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/records/query"))
        .and(body_partial_json(serde_json::json!({
            "query": { "recordType": record_type }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": records
        })))
        .mount(server)
        .await;
}

/// Mounts a single-page query response for one record type in one zone.
pub async fn mount_zone_query(
    server: &MockServer,
    zone: &str,
    record_type: &str,
    records: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path("/records/query"))
        .and(body_partial_json(serde_json::json!({
            "zoneID": { "zoneName": zone },
            "query": { "recordType": record_type }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": records
        })))
        .mount(server)
        .await;
}

fn field(value: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "value": value })
}

/// Builds an album record in the wire format.
pub fn album_record(
    id: &AlbumId,
    name: &str,
    parent: Option<&AlbumId>,
    folder: bool,
) -> serde_json::Value {
    let mut fields = serde_json::json!({
        "albumNameEnc": field(serde_json::json!(STANDARD.encode(name))),
        "albumType": field(serde_json::json!(if folder { 3 } else { 0 })),
    });
    if let Some(parent) = parent {
        fields["parentId"] = field(serde_json::json!(parent.to_string()));
    }
    serde_json::json!({
        "recordName": id.to_string(),
        "recordType": "CPLAlbumByPositionLive",
        "fields": fields,
    })
}

/// Builds an asset record in the wire format, fingerprinted over `payload`
/// and downloadable from `download_url`.
pub fn asset_record(
    record_name: &str,
    filename: &str,
    payload: &[u8],
    favorite: bool,
    download_url: &str,
) -> serde_json::Value {
    serde_json::json!({
        "recordName": record_name,
        "recordType": "CPLAssetAndMasterByAddedDate",
        "fields": {
            "filenameEnc": field(serde_json::json!(STANDARD.encode(filename))),
            "assetDate": field(serde_json::json!(1_700_000_000_000_i64)),
            "isFavorite": field(serde_json::json!(if favorite { 1 } else { 0 })),
            "resOriginalRes": field(serde_json::json!({
                "downloadURL": download_url,
                "size": payload.len(),
            })),
            "resOriginalFingerprint": field(serde_json::json!(
                STANDARD.encode(Fingerprint::of_bytes(payload).as_bytes())
            )),
            "resOriginalFileType": field(serde_json::json!("public.jpeg")),
        },
    })
}
