//! Configuration management for helpdesk.
//!
//! Loads settings from /etc/helpdesk/config.toml (or `HELPDESK_CONFIG`) and
//! lets a handful of environment variables override the secrets.

use crate::error::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/helpdesk/config.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "HELPDESK_CONFIG";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted spreadsheet upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Ticketing API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingConfig {
    /// URL receiving ticket creation POSTs
    #[serde(default)]
    pub endpoint: String,

    /// Header carrying the shared secret
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    #[serde(default)]
    pub api_key: String,

    /// Per-ticket request timeout
    #[serde(default = "default_ticket_timeout")]
    pub timeout_secs: u64,
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

fn default_ticket_timeout() -> u64 {
    30
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_header: default_api_key_header(),
            api_key: String::new(),
            timeout_secs: default_ticket_timeout(),
        }
    }
}

/// Upload session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// File-backed row store location (CLI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_row_store_path")]
    pub row_store_path: PathBuf,
}

/// `<data dir>/helpdesk/rows.ini`, falling back to the working directory.
pub fn default_row_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("helpdesk")
        .join("rows.ini")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            row_store_path: default_row_store_path(),
        }
    }
}

/// Bulk creation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default = "default_preview_count")]
    pub default_preview_count: usize,
}

fn default_preview_count() -> usize {
    crate::orchestrator::DEFAULT_PREVIEW_COUNT
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            default_preview_count: default_preview_count(),
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ticketing: TicketingConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub bulk: BulkConfig,
}

impl Config {
    /// Load config and apply environment overrides. Validation is left to
    /// callers that need a usable ticketing endpoint.
    ///
    /// An explicit path must exist. Without one, `HELPDESK_CONFIG` and then
    /// [`CONFIG_PATH`] are tried, and a missing file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = std::env::var_os(CONFIG_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
                match Self::load_from_path(&path) {
                    Ok(config) => config,
                    Err(ConfigError::Read { source, .. })
                        if source.kind() == ErrorKind::NotFound =>
                    {
                        warn!("Config {} not found, using defaults", path.display());
                        Config::default()
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override secrets and the bind address from the environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HELPDESK_TICKET_ENDPOINT") {
            self.ticketing.endpoint = v;
        }
        if let Some(v) = lookup("HELPDESK_API_KEY") {
            self.ticketing.api_key = v;
        }
        if let Some(v) = lookup("HELPDESK_API_KEY_HEADER") {
            self.ticketing.api_key_header = v;
        }
        if let Some(v) = lookup("HELPDESK_BIND") {
            self.server.bind = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticketing.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ticketing.endpoint is not set (HELPDESK_TICKET_ENDPOINT)".to_string(),
            ));
        }
        reqwest::Url::parse(&self.ticketing.endpoint).map_err(|e| {
            ConfigError::Invalid(format!(
                "ticketing.endpoint '{}' is not a URL: {}",
                self.ticketing.endpoint, e
            ))
        })?;
        if self.ticketing.api_key_header.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ticketing.api_key_header is empty".to_string(),
            ));
        }
        HeaderName::from_bytes(self.ticketing.api_key_header.as_bytes()).map_err(|_| {
            ConfigError::Invalid(format!(
                "ticketing.api_key_header '{}' is not a valid HTTP header name",
                self.ticketing.api_key_header
            ))
        })?;
        HeaderValue::from_str(&self.ticketing.api_key).map_err(|_| {
            ConfigError::Invalid(
                "ticketing.api_key contains characters not allowed in a header".to_string(),
            )
        })?;
        if self.ticketing.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "ticketing.timeout_secs must be positive".to_string(),
            ));
        }
        if self.sessions.ttl_secs == 0 || self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sessions.ttl_secs and sessions.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.ticketing.api_key.is_empty() {
            warn!("ticketing.api_key is empty; requests will be sent without a secret");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        let mut config = Config::default();
        config.ticketing.endpoint = "https://tickets.example.com/api/chamado".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.ticketing.timeout_secs, 30);
        assert_eq!(config.ticketing.api_key_header, "x-api-key");
        assert_eq!(config.sessions.ttl_secs, 3600);
        assert_eq!(config.bulk.default_preview_count, 5);
        assert!(config.storage.row_store_path.ends_with("helpdesk/rows.ini"));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[ticketing]
endpoint = "https://fluig.example.com/chamado"
api_key_header = "X-Fluig-Key"
timeout_secs = 10

[sessions]
ttl_secs = 120
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ticketing.endpoint, "https://fluig.example.com/chamado");
        assert_eq!(config.ticketing.api_key_header, "X-Fluig-Key");
        assert_eq!(config.ticketing.timeout_secs, 10);
        assert_eq!(config.sessions.ttl_secs, 120);
        // Defaults for missing fields
        assert_eq!(config.sessions.sweep_interval_secs, 60);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HELPDESK_TICKET_ENDPOINT", "http://localhost:8080/t"),
            ("HELPDESK_API_KEY", "s3cret"),
            ("HELPDESK_BIND", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ticketing.endpoint, "http://localhost:8080/t");
        assert_eq!(config.ticketing.api_key, "s3cret");
        assert_eq!(config.ticketing.api_key_header, "x-api-key");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(Config::default().validate().is_err());

        let mut bad = valid();
        bad.ticketing.endpoint = "not a url".to_string();
        assert!(bad.validate().is_err());

        let mut bad = valid();
        bad.ticketing.timeout_secs = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_secret_header() {
        let mut bad = valid();
        bad.ticketing.api_key_header = "bad header".to_string();
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("bad header"));

        let mut bad = valid();
        bad.ticketing.api_key = "line\nbreak".to_string();
        assert!(bad.validate().is_err());

        let mut ok = valid();
        ok.ticketing.api_key_header = "X-Fluig-Key".to_string();
        ok.ticketing.api_key = "s3cret".to_string();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[ticketing]\nendpoint = \"https://t.example.com/new\"\n",
        )
        .unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.ticketing.endpoint, "https://t.example.com/new");

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load_from_path(&missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
