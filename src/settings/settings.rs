use crate::domain_model::Identity;
use anyhow::{Result, anyhow};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub token: Token,
    pub session: Session,
    pub log: Log,
    #[serde(default)]
    pub identities: Vec<Identity>,
}

#[derive(Deserialize)]
pub struct Token {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    pub access_secret: String,
    #[serde(default = "default_access_expires_in")]
    pub access_expires_in: String,
    pub refresh_secret: String,
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: String,
    #[serde(default)]
    pub revoke_on_reuse: bool,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("algorithm", &self.algorithm)
            .field("access_secret", &"<redacted>")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("revoke_on_reuse", &self.revoke_on_reuse)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_expires_in() -> String {
    "15m".to_string()
}

fn default_refresh_expires_in() -> String {
    "7d".to_string()
}

fn default_key_prefix() -> String {
    "token".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "TOKENKEEPER";

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build(Config::builder().add_source(File::with_name(path)))
}
