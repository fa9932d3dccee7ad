//! Configuration module for frostpix.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and an environment overlay for
//! credentials. Credentials are wrapped in [`Secret`] so accidental logging
//! never exposes them, and the environment copies are scrubbed in place once
//! parsing completes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable carrying the account username.
pub const ENV_USERNAME: &str = "APPLE_ID_USER";
/// Environment variable carrying the account password.
pub const ENV_PASSWORD: &str = "APPLE_ID_PWD";
/// Environment variable carrying a previously stored trust token.
pub const ENV_TRUST_TOKEN: &str = "TRUST_TOKEN";

/// Placeholder written over credential environment variables after parsing.
pub const ENV_PLACEHOLDER: &str = "<scrubbed>";

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A string that must never appear in logs or debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value. Call sites should be request builders only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(********)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for frostpix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub library: LibraryConfig,
    pub mfa: MfaConfig,
    pub sync: SyncConfig,
    pub daemon: DaemonConfig,
    pub archive: ArchiveConfig,
    pub logging: LoggingConfig,
}

/// Account credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Apple ID username (email). `None` until configured.
    pub username: Option<String>,
    /// Apple ID password.
    pub password: Option<Secret>,
    /// Trust token from an earlier MFA handshake; skips MFA while valid.
    pub trust_token: Option<Secret>,
}

/// Local library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directory of the local mirror.
    pub data_dir: PathBuf,
    /// Take over a stale library lock instead of refusing.
    pub force: bool,
}

/// MFA endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MfaConfig {
    /// TCP port of the MFA HTTP endpoint.
    pub port: u16,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pipeline restarts allowed on recoverable failure.
    pub max_retries: u32,
    /// Concurrent asset downloads during the write phase.
    pub download_threads: usize,
}

/// Daemon-mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Cron expression scheduling sync runs.
    pub schedule: Option<String>,
}

/// Archive settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Delete non-favorite remote originals after archiving.
    pub remote_delete: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and defaults
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/frostpix/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("frostpix")
            .join("config.yaml")
    }

    /// Overlays credentials from the environment on top of the file config.
    ///
    /// Environment values win over file values so a unit file or container
    /// can inject credentials without touching the config on disk.
    pub fn apply_env_overlay(&mut self) {
        if let Ok(user) = std::env::var(ENV_USERNAME) {
            if !user.is_empty() && user != ENV_PLACEHOLDER {
                self.account.username = Some(user);
            }
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            if !password.is_empty() && password != ENV_PLACEHOLDER {
                self.account.password = Some(Secret::new(password));
            }
        }
        if let Ok(token) = std::env::var(ENV_TRUST_TOKEN) {
            if !token.is_empty() && token != ENV_PLACEHOLDER {
                self.account.trust_token = Some(Secret::new(token));
            }
        }
    }

    /// Overwrites the credential environment variables with placeholders so
    /// later error reports and child processes cannot observe them.
    pub fn scrub_env() {
        for key in [ENV_USERNAME, ENV_PASSWORD, ENV_TRUST_TOKEN] {
            if std::env::var_os(key).is_some() {
                std::env::set_var(key, ENV_PLACEHOLDER);
            }
        }
    }

    /// Path where the trust token is persisted (mode 0600), inside the
    /// data directory.
    pub fn trust_token_path(&self) -> PathBuf {
        self.library.data_dir.join(".trust-token")
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("iCloud-Photos"),
            force: false,
        }
    }
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self { port: 80 }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            download_threads: 16,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
