//! Authentication session for the iCloud photo service
//!
//! The session traverses a four-state machine:
//!
//! ```text
//! Unauthenticated ──► MfaRequired ──► Authenticated ──► Ready
//!        │                                  ▲
//!        └──────── trust token ─────────────┘
//! ```
//!
//! Sign-in posts the credentials (plus any stored trust token) to the
//! identity service. A 409 response means a second factor is required: the
//! [`MfaServer`](crate::mfa::MfaServer) is started and its events drive the
//! machine until a code is accepted, after which a trust token is requested
//! and persisted so the next run can skip MFA. `accountLogin` then exchanges
//! the session token for the per-account service map, and zone discovery
//! resolves the photo endpoint, moving the session to `Ready`.
//!
//! The session owns the cookie jar and derived headers; the record-zone
//! client reuses the same `reqwest::Client` so every request carries the
//! authenticated state.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use frostpix_core::config::{Config, Secret};
use frostpix_core::domain::failure::{self, Failure, Severity};
use frostpix_core::ports::observer::{AuthObserver, AuthStage};
use frostpix_core::ports::remote_library::AuthSession;

use crate::mfa::{MfaEvent, MfaMethod, MfaServer};

/// Identity service base URL
const AUTH_BASE_URL: &str = "https://idmsa.apple.com/appleauth/auth";

/// Account setup service base URL
const SETUP_BASE_URL: &str = "https://setup.icloud.com/setup/ws/1";

/// Fixed client id expected by the identity service (X-Apple-Widget-Key)
const AUTH_CLIENT_ID: &str = "d39ba9916b7251055b22c7f910e2ea796ee65e98b2ddecea8f5dde8d9d1a815d";

/// The record zone holding the primary photo library
pub const PRIMARY_ZONE: &str = "PrimarySync";

/// How long the machine waits for an out-of-band MFA code
const MFA_TIMEOUT: Duration = Duration::from_secs(600);

const HEADER_WIDGET_KEY: &str = "X-Apple-Widget-Key";
const HEADER_SCNT: &str = "scnt";
const HEADER_SESSION_ID: &str = "X-Apple-ID-Session-Id";
const HEADER_SESSION_TOKEN: &str = "X-Apple-Session-Token";
const HEADER_TRUST_TOKEN: &str = "X-Apple-TwoSV-Trust-Token";

// ============================================================================
// Wire types
// ============================================================================

/// A trusted phone number offered during the MFA challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrustedPhone {
    /// Identifier used when requesting a resend
    pub id: u32,
    /// Obfuscated number with dial code, for display only
    #[serde(rename = "numberWithDialCode")]
    pub number: String,
}

/// Body of the 409 sign-in response and of 412 resend rejections.
#[derive(Debug, Clone, Default, Deserialize)]
struct MfaChallenge {
    #[serde(rename = "trustedPhoneNumbers", default)]
    trusted_phone_numbers: Vec<TrustedPhone>,
}

#[derive(Debug, Deserialize)]
struct AccountLoginResponse {
    webservices: std::collections::HashMap<String, WebService>,
}

#[derive(Debug, Deserialize)]
struct WebService {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZonesResponse {
    #[serde(default)]
    zones: Vec<ZoneRecord>,
}

#[derive(Debug, Deserialize)]
struct ZoneRecord {
    #[serde(rename = "zoneID")]
    zone_id: ZoneId,
}

#[derive(Debug, Deserialize)]
struct ZoneId {
    #[serde(rename = "zoneName")]
    zone_name: String,
}

// ============================================================================
// Session state
// ============================================================================

#[derive(Debug, Clone)]
enum SessionState {
    Unauthenticated,
    MfaRequired { phones: Vec<TrustedPhone> },
    Authenticated,
    Ready,
}

/// Headers the identity service hands back and expects echoed on subsequent
/// auth calls, plus the tokens derived from the handshake.
#[derive(Debug, Default, Clone)]
struct AuthTokens {
    scnt: Option<String>,
    session_id: Option<String>,
    session_token: Option<String>,
    trust_token: Option<String>,
}

enum SignInOutcome {
    Authenticated,
    MfaRequired { phones: Vec<TrustedPhone> },
}

// ============================================================================
// IcloudSession
// ============================================================================

/// Authenticated session against the iCloud photo service.
///
/// Construct once per process from the [`Config`], call
/// [`authenticate`](Self::authenticate), then build a
/// [`PhotosClient`](crate::client::PhotosClient) from it. The sync engine
/// holds the session through the [`AuthSession`] port for mid-run recovery.
pub struct IcloudSession {
    http: Client,
    username: String,
    password: Secret,
    auth_base: String,
    setup_base: String,
    mfa_port: u16,
    mfa_timeout: Duration,
    trust_token_path: PathBuf,
    state: RwLock<SessionState>,
    tokens: RwLock<AuthTokens>,
    photos_base: RwLock<Option<String>>,
    zones: RwLock<Vec<String>>,
    last_phone_id: RwLock<u32>,
}

impl IcloudSession {
    /// Creates a session from the configuration.
    ///
    /// Requires a username and password; the trust token is taken from the
    /// config (or environment overlay) first, then from the persisted token
    /// file inside the data directory.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let username = config.account.username.clone().ok_or_else(|| {
            Failure::auth("No username configured (set account.username or APPLE_ID_USER)")
        })?;
        let password = config.account.password.clone().ok_or_else(|| {
            Failure::auth("No password configured (set account.password or APPLE_ID_PWD)")
        })?;

        let trust_token_path = config.trust_token_path();
        let trust_token = config
            .account
            .trust_token
            .as_ref()
            .map(|s| s.expose().to_string())
            .or_else(|| {
                std::fs::read_to_string(&trust_token_path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            });

        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            username,
            password,
            auth_base: AUTH_BASE_URL.to_string(),
            setup_base: SETUP_BASE_URL.to_string(),
            mfa_port: config.mfa.port,
            mfa_timeout: MFA_TIMEOUT,
            trust_token_path,
            state: RwLock::new(SessionState::Unauthenticated),
            tokens: RwLock::new(AuthTokens {
                trust_token,
                ..AuthTokens::default()
            }),
            photos_base: RwLock::new(None),
            zones: RwLock::new(Vec::new()),
            last_phone_id: RwLock::new(1),
        })
    }

    /// Overrides the service base URLs (tests).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        auth_base: impl Into<String>,
        setup_base: impl Into<String>,
    ) -> Self {
        self.auth_base = auth_base.into();
        self.setup_base = setup_base.into();
        self
    }

    /// Overrides the MFA wait deadline (tests).
    #[must_use]
    pub fn with_mfa_timeout(mut self, timeout: Duration) -> Self {
        self.mfa_timeout = timeout;
        self
    }

    /// Current observer-visible stage.
    pub fn stage(&self) -> AuthStage {
        match *self.state.read().unwrap() {
            SessionState::Unauthenticated => AuthStage::Unauthenticated,
            SessionState::MfaRequired { .. } => AuthStage::MfaRequired,
            SessionState::Authenticated => AuthStage::Authenticated,
            SessionState::Ready => AuthStage::Ready,
        }
    }

    /// The stored trust token, if any.
    pub fn trust_token(&self) -> Option<String> {
        self.tokens.read().unwrap().trust_token.clone()
    }

    /// The resolved photo service base URL; fails before `Ready`.
    pub fn photos_base(&self) -> anyhow::Result<String> {
        self.photos_base
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| Failure::auth("Session is not ready (no photo endpoint)").into())
    }

    /// The record zones discovered during setup; empty before `Ready`.
    pub fn zones(&self) -> Vec<String> {
        self.zones.read().unwrap().clone()
    }

    /// The underlying HTTP client (shares the cookie jar with the session).
    pub fn http(&self) -> &Client {
        &self.http
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Drives the session to `Ready`, running the MFA handshake when the
    /// identity service demands one.
    pub async fn authenticate(&self, observer: &dyn AuthObserver) -> anyhow::Result<()> {
        observer.on_stage(AuthStage::Unauthenticated);

        if self.begin().await? == AuthStage::MfaRequired {
            // The endpoint lives only as long as the MfaRequired state.
            let mut server = MfaServer::start(self.mfa_port).await?;
            observer.on_stage(AuthStage::MfaRequired);
            observer.on_mfa_waiting(server.port());

            let result = self.drive_mfa(&mut server, observer).await;
            server.stop();
            result?;
        } else {
            debug!("Trust token accepted, skipping MFA");
        }

        *self.state.write().unwrap() = SessionState::Authenticated;
        observer.on_stage(AuthStage::Authenticated);

        self.complete_setup().await?;
        observer.on_stage(AuthStage::Ready);
        info!(user = %self.username, "Session ready");
        Ok(())
    }

    /// Runs the sign-in step alone and returns the resulting stage:
    /// [`AuthStage::MfaRequired`] when a second factor is demanded,
    /// [`AuthStage::Authenticated`] when the trust token was accepted.
    pub async fn begin(&self) -> anyhow::Result<AuthStage> {
        match self.sign_in().await? {
            SignInOutcome::Authenticated => {
                *self.state.write().unwrap() = SessionState::Authenticated;
                Ok(AuthStage::Authenticated)
            }
            SignInOutcome::MfaRequired { phones } => {
                *self.state.write().unwrap() = SessionState::MfaRequired { phones };
                Ok(AuthStage::MfaRequired)
            }
        }
    }

    /// Exchanges the session token for service access and resolves the photo
    /// endpoint, moving the session to `Ready`.
    pub async fn complete_setup(&self) -> anyhow::Result<()> {
        self.account_login().await?;
        self.discover_zones().await?;
        *self.state.write().unwrap() = SessionState::Ready;
        Ok(())
    }

    /// Consumes MFA events until a code is accepted or the deadline passes.
    async fn drive_mfa(
        &self,
        server: &mut MfaServer,
        observer: &dyn AuthObserver,
    ) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + self.mfa_timeout;

        loop {
            let event = match tokio::time::timeout_at(deadline, server.recv()).await {
                Err(_) => {
                    return Err(Failure::auth("Timed out waiting for MFA code")
                        .with_context("timeout_secs", self.mfa_timeout.as_secs())
                        .into());
                }
                Ok(None) => {
                    return Err(Failure::auth("MFA endpoint closed before a code arrived").into());
                }
                Ok(Some(event)) => event,
            };

            match event {
                MfaEvent::Received { method, code } => {
                    match self.submit_mfa(method, &code).await {
                        Ok(()) => break,
                        Err(err) => match failure::classify(&err) {
                            Some(f) if f.severity() == Severity::Warn => observer.on_warning(f),
                            _ => return Err(err),
                        },
                    }
                }
                MfaEvent::Resend { method, phone_id } => {
                    if let Err(err) = self.resend_mfa(method, phone_id).await {
                        match failure::classify(&err) {
                            Some(f) if f.severity() == Severity::Warn => observer.on_warning(f),
                            _ => return Err(err),
                        }
                    }
                }
            }
        }

        // A missing trust token is not fatal; the next run will just go
        // through MFA again.
        if let Err(err) = self.request_trust_token().await {
            warn!(error = %format!("{err:#}"), "Failed to obtain trust token");
        }

        Ok(())
    }

    // ========================================================================
    // Identity service calls
    // ========================================================================

    async fn sign_in(&self) -> anyhow::Result<SignInOutcome> {
        let trust_token = self.tokens.read().unwrap().trust_token.clone();
        let trust_tokens: Vec<&String> = trust_token.iter().collect();

        debug!(user = %self.username, has_trust_token = !trust_tokens.is_empty(), "Signing in");

        let body = serde_json::json!({
            "accountName": self.username,
            "password": self.password.expose(),
            "rememberMe": true,
            "trustTokens": trust_tokens,
        });

        let response = self
            .auth_request(Method::POST, "/signin?isRememberMeEnabled=true")
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::network("Sign-in request failed").recoverable().with_source(e))?;

        self.remember_auth_headers(&response);
        let status = response.status();

        match status {
            StatusCode::OK => Ok(SignInOutcome::Authenticated),
            StatusCode::CONFLICT => {
                let challenge: MfaChallenge = response.json().await.unwrap_or_default();
                info!(
                    phones = challenge.trusted_phone_numbers.len(),
                    "Two-factor authentication required"
                );
                Ok(SignInOutcome::MfaRequired {
                    phones: challenge.trusted_phone_numbers,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Failure::auth("Username/password rejected by the identity service")
                    .with_context("status", status)
                    .into())
            }
            s if s.is_server_error() => Err(Failure::network("Identity service unavailable")
                .recoverable()
                .with_context("status", s)
                .into()),
            s => Err(Failure::auth("Unexpected sign-in status")
                .with_context("status", s)
                .into()),
        }
    }

    /// Submits an MFA code to the endpoint matching the channel it was
    /// requested over. The device endpoint answers 204, the phone endpoint
    /// 200; a rejected code is a warning so the user can try again.
    pub async fn submit_mfa(&self, method: MfaMethod, code: &str) -> anyhow::Result<()> {
        let (path, body, expected) = match method {
            MfaMethod::Device => (
                "/verify/trusted_device/securitycode",
                serde_json::json!({ "securityCode": { "code": code } }),
                StatusCode::NO_CONTENT,
            ),
            MfaMethod::Sms | MfaMethod::Voice => {
                let phone_id = *self.last_phone_id.read().unwrap();
                (
                    "/verify/phone/securitycode",
                    serde_json::json!({
                        "securityCode": { "code": code },
                        "phoneNumber": { "id": phone_id },
                        "mode": method.to_string(),
                    }),
                    StatusCode::OK,
                )
            }
        };

        let response = self
            .auth_request(Method::POST, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Failure::network("MFA code submission failed")
                    .recoverable()
                    .with_source(e)
            })?;

        self.remember_auth_headers(&response);
        let status = response.status();

        if status == expected {
            info!(method = %method, "MFA code accepted");
            return Ok(());
        }

        if status.is_server_error() {
            return Err(Failure::network("Identity service unavailable during MFA")
                .recoverable()
                .with_context("status", status)
                .into());
        }

        Err(Failure::auth("MFA code rejected by the service")
            .warning()
            .with_context("status", status)
            .with_context("method", method)
            .into())
    }

    /// Requests a fresh MFA code over the given channel.
    ///
    /// For phone channels the phone number id is checked against the trusted
    /// list from the MFA challenge before anything is dispatched; an unknown
    /// id produces a warning listing the valid numbers.
    pub async fn resend_mfa(&self, method: MfaMethod, phone_id: u32) -> anyhow::Result<()> {
        let phones = match &*self.state.read().unwrap() {
            SessionState::MfaRequired { phones } => phones.clone(),
            _ => return Err(Failure::auth("No MFA challenge in progress").into()),
        };

        let (path, body) = match method {
            MfaMethod::Device => (
                "/verify/trusted_device/securitycode",
                serde_json::json!({}),
            ),
            MfaMethod::Sms | MfaMethod::Voice => {
                if !phones.iter().any(|p| p.id == phone_id) {
                    return Err(Failure::auth(phone_warning_text(&phones))
                        .warning()
                        .with_context("phone_id", phone_id)
                        .into());
                }
                (
                    "/verify/phone",
                    serde_json::json!({
                        "phoneNumber": { "id": phone_id },
                        "mode": method.to_string(),
                    }),
                )
            }
        };

        let response = self
            .auth_request(Method::PUT, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Failure::network("MFA resend request failed")
                    .recoverable()
                    .with_source(e)
            })?;

        self.remember_auth_headers(&response);
        let status = response.status();

        match status {
            s if s.is_success() => {
                if matches!(method, MfaMethod::Sms | MfaMethod::Voice) {
                    *self.last_phone_id.write().unwrap() = phone_id;
                }
                info!(method = %method, "MFA code resent");
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => {
                // The service rejects the selected number and tells us which
                // ones it would accept.
                let challenge: MfaChallenge = response.json().await.unwrap_or_default();
                let known = if challenge.trusted_phone_numbers.is_empty() {
                    phones
                } else {
                    challenge.trusted_phone_numbers
                };
                Err(Failure::auth(phone_warning_text(&known))
                    .warning()
                    .with_context("phone_id", phone_id)
                    .into())
            }
            StatusCode::FORBIDDEN => Err(Failure::auth("MFA resend rejected: timeout")
                .with_context("status", status)
                .into()),
            s => Err(Failure::auth("Unexpected status for MFA resend")
                .warning()
                .with_context("status", s)
                .with_context("method", method)
                .into()),
        }
    }

    /// Exchanges the MFA success for a reusable trust token and persists it
    /// (mode 0600) inside the data directory.
    async fn request_trust_token(&self) -> anyhow::Result<()> {
        let response = self
            .auth_request(Method::GET, "/2sv/trust")
            .send()
            .await
            .map_err(|e| {
                Failure::network("Trust token request failed")
                    .recoverable()
                    .with_source(e)
            })?;

        self.remember_auth_headers(&response);
        let status = response.status();

        if !status.is_success() {
            return Err(Failure::auth("Trust token request rejected")
                .with_context("status", status)
                .into());
        }

        let token = header_string(&response, HEADER_TRUST_TOKEN)
            .ok_or_else(|| Failure::auth("Trust response carried no token"))?;

        self.tokens.write().unwrap().trust_token = Some(token.clone());
        self.persist_trust_token(&token).await?;
        info!("Trust token stored for future sign-ins");
        Ok(())
    }

    async fn persist_trust_token(&self, token: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.trust_token_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Failure::library("Cannot create data directory for trust token").with_source(e)
            })?;
        }
        tokio::fs::write(&self.trust_token_path, token)
            .await
            .map_err(|e| Failure::library("Cannot persist trust token").with_source(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &self.trust_token_path,
                std::fs::Permissions::from_mode(0o600),
            )
            .await
            .map_err(|e| Failure::library("Cannot restrict trust token permissions").with_source(e))?;
        }

        Ok(())
    }

    // ========================================================================
    // Setup service calls
    // ========================================================================

    /// Exchanges the session token for the account's web service map and
    /// derives the photo database base URL.
    async fn account_login(&self) -> anyhow::Result<()> {
        let (session_token, trust_token) = {
            let tokens = self.tokens.read().unwrap();
            (tokens.session_token.clone(), tokens.trust_token.clone())
        };
        let session_token = session_token
            .ok_or_else(|| Failure::auth("No session token to exchange for service access"))?;

        let body = serde_json::json!({
            "dsWebAuthToken": session_token,
            "trustToken": trust_token,
            "extended_login": true,
        });

        let response = self
            .http
            .post(format!("{}/accountLogin", self.setup_base))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Failure::network("accountLogin request failed")
                    .recoverable()
                    .with_source(e)
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let setup: AccountLoginResponse = response
                    .json()
                    .await
                    .map_err(|e| Failure::auth("Malformed accountLogin response").with_source(e))?;
                let url = setup
                    .webservices
                    .get("ckdatabasews")
                    .and_then(|s| s.url.clone())
                    .ok_or_else(|| {
                        Failure::auth("accountLogin response carries no photo service endpoint")
                    })?;
                let base = format!(
                    "{}/database/1/com.apple.photos.cloud/production/private",
                    url.trim_end_matches('/')
                );
                debug!(%base, "Photo service endpoint resolved");
                *self.photos_base.write().unwrap() = Some(base);
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::MISDIRECTED_REQUEST => {
                Err(Failure::auth("Session expired during service setup")
                    .recoverable()
                    .with_context("status", status)
                    .into())
            }
            s if s.is_server_error() => Err(Failure::network("Setup service unavailable")
                .recoverable()
                .with_context("status", s)
                .into()),
            s => Err(Failure::auth("Unexpected accountLogin status")
                .with_context("status", s)
                .into()),
        }
    }

    /// Enumerates the account's record zones; the sync engine later queries
    /// every one of them. The primary zone must be present.
    async fn discover_zones(&self) -> anyhow::Result<()> {
        let base = self.photos_base()?;

        let response = self
            .http
            .post(format!("{base}/zones/list"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                Failure::network("Zone discovery request failed")
                    .recoverable()
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_service_status(status, "Zone discovery").into());
        }

        let listing: ZonesResponse = response
            .json()
            .await
            .map_err(|e| Failure::sync("Malformed zone list").with_source(e))?;

        let names: Vec<String> = listing
            .zones
            .into_iter()
            .map(|z| z.zone_id.zone_name)
            .collect();

        if !names.iter().any(|name| name == PRIMARY_ZONE) {
            return Err(Failure::auth("Primary photo zone missing from account")
                .with_context("zones", names.len())
                .into());
        }

        debug!(zones = names.len(), "Photo zones discovered");
        *self.zones.write().unwrap() = names;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn auth_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.auth_base, path))
            .header(HEADER_WIDGET_KEY, AUTH_CLIENT_ID)
            .header(reqwest::header::ACCEPT, "application/json");

        let tokens = self.tokens.read().unwrap();
        if let Some(scnt) = &tokens.scnt {
            builder = builder.header(HEADER_SCNT, scnt);
        }
        if let Some(session_id) = &tokens.session_id {
            builder = builder.header(HEADER_SESSION_ID, session_id);
        }
        builder
    }

    /// Captures the rolling handshake headers the identity service expects
    /// echoed back on the next call.
    fn remember_auth_headers(&self, response: &reqwest::Response) {
        let mut tokens = self.tokens.write().unwrap();
        if let Some(scnt) = header_string(response, HEADER_SCNT) {
            tokens.scnt = Some(scnt);
        }
        if let Some(session_id) = header_string(response, HEADER_SESSION_ID) {
            tokens.session_id = Some(session_id);
        }
        if let Some(session_token) = header_string(response, HEADER_SESSION_TOKEN) {
            tokens.session_token = Some(session_token);
        }
    }
}

#[async_trait::async_trait]
impl AuthSession for IcloudSession {
    /// Rebuilds the session from stored credentials and the trust token.
    /// An MFA demand at this point is fatal: there is nobody to answer it.
    async fn refresh(&self) -> anyhow::Result<()> {
        info!("Refreshing session");
        match self.sign_in().await? {
            SignInOutcome::Authenticated => {}
            SignInOutcome::MfaRequired { .. } => {
                return Err(Failure::auth(
                    "Session refresh requires MFA; run `frostpix token` interactively to re-trust this machine",
                )
                .into());
            }
        }
        self.complete_setup().await
    }
}

/// Maps a non-success service status to a failure.
pub(crate) fn map_service_status(status: StatusCode, what: &str) -> Failure {
    match status {
        StatusCode::UNAUTHORIZED => Failure::auth(format!("{what}: session token expired"))
            .recoverable()
            .with_context("status", status),
        StatusCode::TOO_MANY_REQUESTS => Failure::network(format!("{what}: rate limited"))
            .recoverable()
            .with_context("status", status),
        s if s.is_server_error() => Failure::network(format!("{what}: service unavailable"))
            .recoverable()
            .with_context("status", s),
        s => Failure::network(format!("{what}: unexpected status"))
            .with_context("status", s),
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The deterministic warning for a resend against an unknown phone number.
fn phone_warning_text(phones: &[TrustedPhone]) -> String {
    let listing = phones
        .iter()
        .map(|p| format!("- {}: {}", p.id, p.number))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Selected Phone Number ID does not exist.\nAvailable numbers:\n{listing}")
}
