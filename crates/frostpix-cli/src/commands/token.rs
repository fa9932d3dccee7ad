//! Token command - authenticate and print the trust token
//!
//! Runs the full auth flow (including the MFA handshake when the identity
//! service demands one) and prints the resulting trust token. Useful for
//! provisioning headless machines: run `frostpix token` interactively once,
//! then hand the token to the daemon via TRUST_TOKEN or the config file.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use frostpix_core::domain::Failure;

use crate::commands::{load_config, ready_session, CommonOpts};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct TokenCommand {
    #[command(flatten)]
    pub common: CommonOpts,
}

impl TokenCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path, &self.common);

        let session = ready_session(&config, format).await?;

        let token = session.trust_token().ok_or_else(|| {
            Failure::auth("Authentication succeeded but no trust token was issued")
        })?;

        output::print_token(format, &token);
        Ok(())
    }
}
