//! Integration tests for frostpix-icloud
//!
//! Uses wiremock to simulate the identity, setup and photo services and
//! verifies end-to-end behavior of the auth session, the MFA endpoint,
//! record queries and verified downloads.

mod common;

mod test_download;
mod test_mfa_server;
mod test_query;
mod test_session;
