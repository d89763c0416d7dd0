//! Configuration for adminkit tools.
//!
//! A single TOML file (`config.toml` under the platform config dir),
//! overridden by `ADMINKIT_` environment variables, and translated into
//! the runtime settings types of `adminkit-api` and `adminkit-core`.
//! Nested keys use a double underscore: `ADMINKIT_JOBS__MAX_ATTEMPTS=30`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adminkit_api::TransportConfig;
use adminkit_core::{CachePolicy, PollSettings};

const ENV_PREFIX: &str = "ADMINKIT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub jobs: JobSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Backend API root, e.g. "https://admin.example.com/api".
    pub base_url: Option<String>,

    pub timeout_secs: u64,

    /// Overrides the built-in `adminkit/<version>` agent.
    pub user_agent: Option<String>,

    /// Extra PEM root certificate for self-hosted backends.
    pub ca_cert: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            user_agent: None,
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Entry cap with LRU eviction. Absent or 0 keeps everything.
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobSettings {
    pub initial_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            poll_interval_ms: 2_000,
            max_attempts: 60,
        }
    }
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// The configured API root, validated.
    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        let raw = self
            .api
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::invalid("api.base_url", "not set"))?;
        let url: url::Url = raw
            .parse()
            .map_err(|e| ConfigError::invalid("api.base_url", format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "api.base_url",
                format!("expected http or https, got '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }

    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::invalid("api.timeout_secs", "must be at least 1"));
        }
        let mut transport = TransportConfig {
            timeout: Duration::from_secs(self.api.timeout_secs),
            ca_cert: self.api.ca_cert.clone(),
            ..TransportConfig::default()
        };
        if let Some(ref agent) = self.api.user_agent {
            transport.user_agent.clone_from(agent);
        }
        Ok(transport)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache
            .capacity
            .and_then(NonZeroUsize::new)
            .map_or_else(CachePolicy::unbounded, CachePolicy::bounded)
    }

    pub fn poll_settings(&self) -> Result<PollSettings, ConfigError> {
        if self.jobs.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("jobs.poll_interval_ms", "must be at least 1"));
        }
        if self.jobs.max_attempts == 0 {
            return Err(ConfigError::invalid("jobs.max_attempts", "must be at least 1"));
        }
        Ok(PollSettings {
            initial_delay: Duration::from_millis(self.jobs.initial_delay_ms),
            interval: Duration::from_millis(self.jobs.poll_interval_ms),
            max_attempts: self.jobs.max_attempts,
        })
    }

    /// Render as TOML, e.g. for `adminkit config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "adminkit", "adminkit").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("adminkit");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the default path and environment. A missing file is fine.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` and environment. A missing file is fine.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}
