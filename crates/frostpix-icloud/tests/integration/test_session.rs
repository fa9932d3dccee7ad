//! Integration tests for the auth session state machine
//!
//! Drives the session against wiremock-simulated identity and setup
//! services: the trust-token fast path, the MFA challenge, resend error
//! mapping (unknown phone ids, 412, 403), and the full out-of-band MFA
//! handshake through the real HTTP endpoint.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frostpix_core::domain::failure::{self, FailureKind, Severity};
use frostpix_core::ports::observer::{AuthStage, NullObserver};
use frostpix_core::ports::remote_library::AuthSession;
use frostpix_icloud::mfa::MfaMethod;

use crate::common;

fn two_phones() -> serde_json::Value {
    serde_json::json!([
        { "id": 2, "numberWithDialCode": "+49-123-456" },
        { "id": 3, "numberWithDialCode": "+49-789-123" },
    ])
}

#[tokio::test]
async fn test_trust_token_path_skips_mfa() {
    let server = MockServer::start().await;
    common::mount_signin_ok(&server).await;
    common::mount_setup(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 0);
    config.account.trust_token = Some(frostpix_core::config::Secret::new("trusted-001"));
    let session = common::session_against(&server, &config);

    session.authenticate(&NullObserver).await.unwrap();

    assert_eq!(session.stage(), AuthStage::Ready);
    let base = session.photos_base().unwrap();
    assert!(base.ends_with("/db/database/1/com.apple.photos.cloud/production/private"));
}

#[tokio::test]
async fn test_zones_exposed_after_setup() {
    let server = MockServer::start().await;
    common::mount_signin_ok(&server).await;
    common::mount_setup_with_zones(&server, &["PrimarySync", "SharedSync"]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 0);
    config.account.trust_token = Some(frostpix_core::config::Secret::new("trusted-001"));
    let session = common::session_against(&server, &config);

    assert!(session.zones().is_empty());
    session.authenticate(&NullObserver).await.unwrap();
    assert_eq!(
        session.zones(),
        vec!["PrimarySync".to_string(), "SharedSync".to_string()]
    );
}

#[tokio::test]
async fn test_missing_primary_zone_is_fatal() {
    let server = MockServer::start().await;
    common::mount_signin_ok(&server).await;
    common::mount_setup_with_zones(&server, &["SomeOtherZone"]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 0);
    config.account.trust_token = Some(frostpix_core::config::Secret::new("trusted-001"));
    let session = common::session_against(&server, &config);

    let err = session.authenticate(&NullObserver).await.unwrap_err();
    let f = failure::classify(&err).expect("typed failure expected");
    assert_eq!(f.kind(), FailureKind::Auth);
}

#[tokio::test]
async fn test_invalid_credentials_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    let err = session.begin().await.unwrap_err();
    let f = failure::classify(&err).expect("typed failure expected");
    assert_eq!(f.kind(), FailureKind::Auth);
    assert!(!f.is_recoverable());
}

#[tokio::test]
async fn test_server_error_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    let err = session.begin().await.unwrap_err();
    assert!(failure::is_recoverable(&err));
}

#[tokio::test]
async fn test_resend_to_unknown_phone_lists_valid_numbers() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    assert_eq!(session.begin().await.unwrap(), AuthStage::MfaRequired);

    let err = session.resend_mfa(MfaMethod::Sms, 9).await.unwrap_err();
    let f = failure::classify(&err).expect("typed failure expected");
    assert_eq!(f.severity(), Severity::Warn);
    assert_eq!(
        f.message(),
        "Selected Phone Number ID does not exist.\nAvailable numbers:\n- 2: +49-123-456\n- 3: +49-789-123"
    );
}

#[tokio::test]
async fn test_resend_to_known_phone_dispatches() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    Mock::given(method("PUT"))
        .and(path("/auth/verify/phone"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    session.begin().await.unwrap();
    session.resend_mfa(MfaMethod::Sms, 2).await.unwrap();
}

#[tokio::test]
async fn test_resend_precondition_failed_maps_to_phone_warning() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    // The service disagrees about the trusted list and sends its own.
    Mock::given(method("PUT"))
        .and(path("/auth/verify/phone"))
        .respond_with(ResponseTemplate::new(412).set_body_json(serde_json::json!({
            "trustedPhoneNumbers": [
                { "id": 7, "numberWithDialCode": "+1-555-0100" }
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    session.begin().await.unwrap();
    let err = session.resend_mfa(MfaMethod::Sms, 2).await.unwrap_err();
    let f = failure::classify(&err).unwrap();
    assert_eq!(f.severity(), Severity::Warn);
    assert!(f.message().contains("- 7: +1-555-0100"));
}

#[tokio::test]
async fn test_resend_forbidden_is_timeout() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    Mock::given(method("PUT"))
        .and(path("/auth/verify/phone"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    session.begin().await.unwrap();
    let err = session.resend_mfa(MfaMethod::Sms, 2).await.unwrap_err();
    let f = failure::classify(&err).unwrap();
    assert_eq!(f.message(), "MFA resend rejected: timeout");
    assert_ne!(f.severity(), Severity::Warn);
}

#[tokio::test]
async fn test_submit_device_code_expects_204() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    Mock::given(method("POST"))
        .and(path("/auth/verify/trusted_device/securitycode"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    session.begin().await.unwrap();
    session.submit_mfa(MfaMethod::Device, "123456").await.unwrap();
}

#[tokio::test]
async fn test_submit_rejected_code_is_warning() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    Mock::given(method("POST"))
        .and(path("/auth/verify/trusted_device/securitycode"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    session.begin().await.unwrap();
    let err = session.submit_mfa(MfaMethod::Device, "999999").await.unwrap_err();
    let f = failure::classify(&err).unwrap();
    assert_eq!(f.severity(), Severity::Warn);
}

#[tokio::test]
async fn test_full_mfa_handshake_through_http_endpoint() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;
    common::mount_setup(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/verify/trusted_device/securitycode"))
        .respond_with(
            ResponseTemplate::new(204).append_header("X-Apple-Session-Token", "post-mfa-token"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/2sv/trust"))
        .respond_with(
            ResponseTemplate::new(204).append_header("X-Apple-TwoSV-Trust-Token", "trust-xyz"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    // Fixed port: the MFA endpoint address must be known to the test client.
    let config = common::test_config(dir.path(), 8693);
    let session = Arc::new(common::session_against(&server, &config));

    let auth_task = {
        let session = session.clone();
        tokio::spawn(async move { session.authenticate(&NullObserver).await })
    };

    // The endpoint comes up when the machine enters MfaRequired; poll until
    // the code submission lands.
    let client = reqwest::Client::new();
    let mut submitted = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(response) = client
            .post("http://127.0.0.1:8693/mfa?code=123456")
            .send()
            .await
        {
            if response.status() == 200 {
                submitted = true;
                break;
            }
        }
    }
    assert!(submitted, "MFA code submission never succeeded");

    auth_task.await.unwrap().unwrap();
    assert_eq!(session.stage(), AuthStage::Ready);
    assert_eq!(session.trust_token().as_deref(), Some("trust-xyz"));

    // The trust token is persisted inside the data dir, mode 0600.
    let token_path = dir.path().join(".trust-token");
    assert_eq!(std::fs::read_to_string(&token_path).unwrap(), "trust-xyz");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&token_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_refresh_rebuilds_session_without_mfa() {
    let server = MockServer::start().await;
    common::mount_signin_ok(&server).await;
    common::mount_setup(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 0);
    config.account.trust_token = Some(frostpix_core::config::Secret::new("trusted-001"));
    let session = common::session_against(&server, &config);

    session.refresh().await.unwrap();
    assert_eq!(session.stage(), AuthStage::Ready);
}

#[tokio::test]
async fn test_refresh_fails_when_mfa_demanded() {
    let server = MockServer::start().await;
    common::mount_signin_mfa(&server, two_phones()).await;

    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 0);
    let session = common::session_against(&server, &config);

    let err = session.refresh().await.unwrap_err();
    let f = failure::classify(&err).unwrap();
    assert_eq!(f.kind(), FailureKind::Auth);
    assert!(!f.is_recoverable());
}
