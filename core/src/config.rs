//! Client-side backend configuration.
//!
//! A `BackendConfig` is an ordinary value: callers build one (or load it
//! from a JSON file) and pass it to whatever needs to reach the data API.
//! Nothing in this crate reads global state, so tests can hold several
//! configurations side by side.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::{AuthMode, Credentials};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the data API lives and how to authenticate against it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub endpoint: String,
    #[serde(default)]
    pub default_auth_mode: AuthMode,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl BackendConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            default_auth_mode: AuthMode::default(),
            credentials: Credentials::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got `{}`",
                self.endpoint
            )));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("pageSize must be at least 1".to_string()));
        }
        Ok(())
    }
}
