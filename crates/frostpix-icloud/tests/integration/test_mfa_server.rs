//! Integration tests for the MFA HTTP endpoint
//!
//! Starts the real server on an ephemeral port and drives it with a plain
//! HTTP client, verifying the exact statuses, bodies and emitted events of
//! every route.

use std::time::Duration;

use frostpix_icloud::mfa::{MfaEvent, MfaMethod, MfaServer};

async fn post(url: &str) -> (reqwest::StatusCode, serde_json::Value) {
    let response = reqwest::Client::new().post(url).send().await.unwrap();
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap();
    (status, body)
}

async fn get(url: &str) -> (reqwest::StatusCode, serde_json::Value) {
    let response = reqwest::Client::new().get(url).send().await.unwrap();
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_mfa_code_happy_path() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, body) = post(&format!("http://127.0.0.1:{port}/mfa?code=123456")).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "Read MFA code: 123456");

    let event = server.recv().await.unwrap();
    assert_eq!(
        event,
        MfaEvent::Received {
            method: MfaMethod::Device,
            code: "123456".to_string(),
        }
    );

    // Exactly once.
    let extra = tokio::time::timeout(Duration::from_millis(100), server.recv()).await;
    assert!(extra.is_err(), "no further event expected");
}

#[tokio::test]
async fn test_mfa_code_wrong_format() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    // "123 456" url-encodes the space.
    let (status, body) = post(&format!("http://127.0.0.1:{port}/mfa?code=123%20456")).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["message"],
        "Unexpected MFA code format! Expecting 6 digits"
    );

    // No state transition: nothing was emitted.
    let event = tokio::time::timeout(Duration::from_millis(100), server.recv()).await;
    assert!(event.is_err(), "malformed code must not emit an event");
}

#[tokio::test]
async fn test_mfa_code_missing_param() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, _) = post(&format!("http://127.0.0.1:{port}/mfa")).await;
    assert_eq!(status, 400);

    let event = tokio::time::timeout(Duration::from_millis(100), server.recv()).await;
    assert!(event.is_err());
}

#[tokio::test]
async fn test_resend_sms_with_phone_id() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, _) = post(&format!(
        "http://127.0.0.1:{port}/resend_mfa?method=sms&phoneNumberId=2"
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        server.recv().await.unwrap(),
        MfaEvent::Resend {
            method: MfaMethod::Sms,
            phone_id: 2,
        }
    );
}

#[tokio::test]
async fn test_resend_invalid_phone_id_defaults_to_one() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, _) = post(&format!(
        "http://127.0.0.1:{port}/resend_mfa?method=voice&phoneNumberId=abc"
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        server.recv().await.unwrap(),
        MfaEvent::Resend {
            method: MfaMethod::Voice,
            phone_id: 1,
        }
    );
}

#[tokio::test]
async fn test_resend_unknown_method() {
    let mut server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, body) = post(&format!("http://127.0.0.1:{port}/resend_mfa?method=fax")).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["message"],
        "Resend method not supported! Expecting device, sms or voice"
    );

    let event = tokio::time::timeout(Duration::from_millis(100), server.recv()).await;
    assert!(event.is_err());
}

#[tokio::test]
async fn test_root_banner() {
    let server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, body) = get(&format!("http://127.0.0.1:{port}/")).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "frostpix MFA endpoint");
}

#[tokio::test]
async fn test_unknown_get_route() {
    let server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, body) = get(&format!("http://127.0.0.1:{port}/whatever")).await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Method not supported: GET /whatever");
}

#[tokio::test]
async fn test_unknown_post_route_lists_endpoints() {
    let server = MfaServer::start(0).await.unwrap();
    let port = server.port();

    let (status, body) = post(&format!("http://127.0.0.1:{port}/nope")).await;

    assert_eq!(status, 404);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("POST /mfa"));
    assert!(message.contains("POST /resend_mfa"));
}

#[tokio::test]
async fn test_stop_closes_event_channel() {
    let mut server = MfaServer::start(0).await.unwrap();
    server.stop();

    let event = tokio::time::timeout(Duration::from_secs(1), server.recv())
        .await
        .expect("recv should resolve after stop");
    assert!(event.is_none());
}
