//! Service configuration.
//!
//! # Responsibility
//! - Load runtime settings from TOML with a default for every field.
//! - Derive share URLs and link TTLs from settings.
//!
//! # Invariants
//! - Unknown keys are rejected so typos never silently fall back to defaults.
//! - A loaded config has passed `validate()`.

use crate::logging::default_log_level;
use crate::model::share_link::ShareToken;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    /// Client origin; share URLs are `<share_base_url>/share/<token>`.
    pub share_base_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Applied when a share request carries no explicit expiry.
    pub default_link_ttl_secs: Option<u64>,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("docsign.sqlite3"),
            share_base_url: "http://localhost:5173".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_link_ttl_secs: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.share_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "share_base_url cannot be empty".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.default_link_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "default_link_ttl_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Public URL a recipient opens for `token`.
    pub fn share_url(&self, token: &ShareToken) -> String {
        format!(
            "{}/share/{}",
            self.share_base_url.trim().trim_end_matches('/'),
            token
        )
    }

    /// Default link lifetime in milliseconds.
    pub fn default_link_ttl_ms(&self) -> Option<i64> {
        self.default_link_ttl_secs
            .map(|secs| i64::try_from(secs.saturating_mul(1_000)).unwrap_or(i64::MAX))
    }
}
