//! Configuration loading and management.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Shortest signing secret `serve` accepts.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 30 * 24 * 60 * 60;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Address the HTTP API listens on.
    pub bind_address: SocketAddr,
    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: Option<String>,
    /// How long an issued token stays valid.
    pub token_lifetime_secs: u64,
    /// Origins allowed to call the API from a browser.
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("bind_address", &self.bind_address)
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tasktime.db"),
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 5050)),
            jwt_secret: None,
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: built-in defaults, the user config file, `path`,
    /// then `TASKTIME_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TASKTIME_"));

        figment.extract()
    }

    /// Returns the signing secret, rejecting a missing or short one.
    pub fn signing_secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref() {
            None => bail!("jwt_secret is not set; set TASKTIME_JWT_SECRET or add it to the config file"),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                bail!("jwt_secret must be at least {MIN_SECRET_LEN} characters")
            }
            Some(secret) => Ok(secret),
        }
    }
}

/// Returns the platform-specific config directory for tasktime.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tasktime"))
}

/// Returns the platform-specific data directory for tasktime.
///
/// On Linux: `~/.local/share/tasktime`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tasktime"))
}
