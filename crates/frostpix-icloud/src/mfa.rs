//! MFA HTTP endpoint
//!
//! A short-lived HTTP listener that lets the user hand an out-of-band MFA
//! code to the auth state machine, or request that a new code be sent. The
//! server is started just before the session enters the MFA-required state
//! and stopped on the transition out of it.
//!
//! ## Routes
//!
//! - `POST /mfa?code=DDDDDD` - submit a six-digit code
//! - `POST /resend_mfa?method={device|sms|voice}[&phoneNumberId=N]` -
//!   request a new code over the given channel
//! - `GET /` - identity banner
//!
//! All responses are JSON bodies of the form `{"message": "..."}`.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Channel over which a new MFA code can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaMethod {
    /// Push to a trusted device
    Device,
    /// Text message to a trusted phone number
    Sms,
    /// Voice call to a trusted phone number
    Voice,
}

impl FromStr for MfaMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(MfaMethod::Device),
            "sms" => Ok(MfaMethod::Sms),
            "voice" => Ok(MfaMethod::Voice),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MfaMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MfaMethod::Device => "device",
            MfaMethod::Sms => "sms",
            MfaMethod::Voice => "voice",
        };
        write!(f, "{s}")
    }
}

/// Event delivered from the endpoint into the auth state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaEvent {
    /// A code was submitted via `POST /mfa`
    Received {
        /// Channel the code arrived over (device for the `/mfa` route)
        method: MfaMethod,
        /// The six-digit code
        code: String,
    },
    /// A resend was requested via `POST /resend_mfa`
    Resend {
        /// Requested channel
        method: MfaMethod,
        /// Trusted phone number id (ignored for the device channel)
        phone_id: u32,
    },
}

/// Running MFA endpoint.
///
/// Events are consumed through [`recv`](Self::recv); dropping the server (or
/// calling [`stop`](Self::stop)) cancels the accept loop.
pub struct MfaServer {
    local_addr: SocketAddr,
    events: mpsc::Receiver<MfaEvent>,
    shutdown: CancellationToken,
}

impl MfaServer {
    /// Binds the endpoint on `0.0.0.0:port` and starts serving.
    ///
    /// Pass port `0` to bind an ephemeral port (tests).
    pub async fn start(port: u16) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("Failed to bind MFA endpoint on port {port}"))?;
        let local_addr = listener.local_addr().context("Failed to read local address")?;

        let (tx, events) = mpsc::channel::<MfaEvent>(8);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = listener.accept() => {
                        let (stream, peer) = match accepted {
                            Ok(pair) => pair,
                            Err(e) => {
                                warn!(error = %e, "MFA endpoint accept error");
                                continue;
                            }
                        };
                        debug!(%peer, "MFA endpoint connection");

                        let io = TokioIo::new(stream);
                        let tx = tx.clone();
                        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                            let tx = tx.clone();
                            async move { handle_request(req, tx).await }
                        });

                        tokio::spawn(async move {
                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                warn!(error = %e, "MFA endpoint connection error");
                            }
                        });
                    }
                }
            }
            info!("MFA endpoint stopped");
        });

        info!(port = local_addr.port(), "MFA endpoint listening");
        Ok(Self {
            local_addr,
            events,
            shutdown,
        })
    }

    /// The bound address (useful when started with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Receives the next MFA event; `None` after shutdown.
    pub async fn recv(&mut self) -> Option<MfaEvent> {
        self.events.recv().await
    }

    /// Stops the accept loop.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for MfaServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============================================================================
// Request handling
// ============================================================================

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    tx: mpsc::Sender<MfaEvent>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let params = query_params(req.uri());

    let response = if method == Method::POST && path == "/mfa" {
        let code = params
            .iter()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        if is_valid_code(&code) {
            info!(code = %code, "MFA code received");
            let _ = tx
                .send(MfaEvent::Received {
                    method: MfaMethod::Device,
                    code: code.clone(),
                })
                .await;
            json_response(StatusCode::OK, &format!("Read MFA code: {code}"))
        } else {
            warn!(code = %code, "Rejected malformed MFA code");
            json_response(
                StatusCode::BAD_REQUEST,
                "Unexpected MFA code format! Expecting 6 digits",
            )
        }
    } else if method == Method::POST && path == "/resend_mfa" {
        let method_param = params
            .iter()
            .find(|(k, _)| k == "method")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        match method_param.parse::<MfaMethod>() {
            Ok(mfa_method) => {
                // An unparseable phone number id silently defaults to the
                // first trusted number.
                let phone_id = params
                    .iter()
                    .find(|(k, _)| k == "phoneNumberId")
                    .and_then(|(_, v)| v.parse::<u32>().ok())
                    .unwrap_or(1);
                info!(method = %mfa_method, phone_id, "MFA resend requested");
                let _ = tx
                    .send(MfaEvent::Resend {
                        method: mfa_method,
                        phone_id,
                    })
                    .await;
                json_response(
                    StatusCode::OK,
                    &format!("Requesting MFA resend with method {mfa_method}"),
                )
            }
            Err(()) => {
                warn!(method = %method_param, "Rejected unknown MFA resend method");
                json_response(
                    StatusCode::BAD_REQUEST,
                    "Resend method not supported! Expecting device, sms or voice",
                )
            }
        }
    } else if method == Method::GET && path == "/" {
        json_response(StatusCode::OK, "frostpix MFA endpoint")
    } else if method == Method::GET {
        warn!(%path, "Unknown GET route on MFA endpoint");
        json_response(
            StatusCode::BAD_REQUEST,
            &format!("Method not supported: GET {path}"),
        )
    } else {
        warn!(%method, %path, "Unknown route on MFA endpoint");
        json_response(
            StatusCode::NOT_FOUND,
            "Route not found. Available endpoints: POST /mfa, POST /resend_mfa",
        )
    };

    Ok(response)
}

/// A valid MFA code is exactly six decimal digits.
fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

fn query_params(uri: &hyper::Uri) -> Vec<(String, String)> {
    let url = match url::Url::parse(&format!("http://localhost{uri}")) {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn json_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
