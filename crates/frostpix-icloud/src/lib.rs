//! iCloud Photos service adapter for frostpix
//!
//! Implements the remote side of the sync engine:
//!
//! - [`session`] - the authentication state machine (sign-in, MFA handshake,
//!   trust-token exchange, photo-endpoint discovery, mid-run refresh)
//! - [`mfa`] - the short-lived HTTP endpoint that feeds MFA codes and resend
//!   requests into the state machine
//! - [`client`] - the record-zone query client implementing the
//!   [`RemoteLibrary`](frostpix_core::ports::RemoteLibrary) port, including
//!   verified streaming downloads
//! - [`query`] - wire DTOs and record parsing for the reverse-engineered
//!   record-zone protocol
//!
//! The protocol details live entirely behind the port traits; the engines
//! never see a status code or a record field.

pub mod client;
pub mod mfa;
pub mod query;
pub mod session;

pub use client::PhotosClient;
pub use mfa::{MfaEvent, MfaMethod, MfaServer};
pub use session::IcloudSession;
