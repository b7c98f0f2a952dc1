//! Configuration for EventDekho tools.
//!
//! A flat TOML file layered under `EVENTDEKHO_*` environment variables,
//! translated into an [`eventdekho_core::BackendConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eventdekho_api::{TlsMode, TransportConfig, resolve_base_url};
use eventdekho_core::BackendConfig;

/// Prefix for environment overrides, e.g. `EVENTDEKHO_API_URL`.
pub const ENV_PREFIX: &str = "EVENTDEKHO_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Explicit backend URL; overrides host-based selection.
    pub api_url: Option<String>,

    /// Host the client is served from. Local hosts select the local
    /// development backend, anything else the deployed one.
    pub origin_host: String,

    /// Per-request timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,

    pub cache_ttl_secs: u64,
    pub stream_retry_ms: u64,
    pub search_debounce_ms: u64,
    pub min_query_length: usize,
    pub page_size: u32,

    /// Path to a custom CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid certificates.
    pub insecure: bool,

    /// Session cookie (`name=value`) to seed the cookie jar with.
    pub session_cookie: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            origin_host: "localhost".into(),
            timeout_secs: None,
            cache_ttl_secs: 300,
            stream_retry_ms: 5000,
            search_debounce_ms: 300,
            min_query_length: 2,
            page_size: 10,
            ca_cert: None,
            insecure: false,
            session_cookie: None,
        }
    }
}

impl Config {
    /// Validate and translate into backend settings.
    pub fn to_backend_config(&self) -> Result<BackendConfig, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Validation {
                field: "page_size".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let base_url = resolve_base_url(self.api_url.as_deref(), &self.origin_host).map_err(
            |e| ConfigError::Validation {
                field: "api_url".into(),
                reason: e.to_string(),
            },
        )?;

        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };

        let mut transport = TransportConfig {
            tls,
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..TransportConfig::default()
        };
        if let Some(ref cookie) = self.session_cookie {
            transport = transport.with_session_cookie(SecretString::from(cookie.clone()));
        }

        Ok(BackendConfig {
            base_url,
            transport,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            stream_retry_delay: Duration::from_millis(self.stream_retry_ms),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            min_query_length: self.min_query_length,
            page_size: self.page_size,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "eventdekho", "eventdekho").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("eventdekho");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file at `path`, then env.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

/// Extract a [`Config`] from an arbitrary figment.
pub fn load_from(figment: &Figment) -> Result<Config, ConfigError> {
    Ok(figment.extract()?)
}

/// Load from the canonical config file and environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&figment_for(&config_path()))
}

/// Load config, returning the defaults if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}
