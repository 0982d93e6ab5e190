//! Configuration management for the Flitify panel
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/flitify/
//! - macOS: ~/Library/Application Support/flitify/
//! - Windows: %APPDATA%\flitify\

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::token_store::{FileTokenStore, TokenStoreError};

/// Overrides `backend.url` when set
pub const BACKEND_URL_ENV: &str = "FLITIFY_BACKEND_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Panel backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Token storage
    #[serde(default)]
    pub session: SessionConfig,

    /// Terminal panel settings
    #[serde(default)]
    pub tui: TuiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the panel backend
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token file; defaults to the platform data directory
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiConfig {
    /// Enable mouse support
    #[serde(default = "default_true")]
    pub mouse: bool,

    /// View opened after login
    #[serde(default)]
    pub default_view: DefaultView,

    /// Where downloaded files are written; defaults to the working directory
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultView {
    #[default]
    Interact,
    Computers,
}

fn default_backend_url() -> String {
    format!("http://localhost:{}", crate::DEFAULT_BACKEND_PORT)
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            mouse: true,
            default_view: DefaultView::default(),
            download_dir: None,
        }
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("flitify"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Backend URL overridden by {}", BACKEND_URL_ENV);
            self.backend.url = url;
        }
    }

    /// Token store for the configured location
    pub fn token_store(&self) -> Result<FileTokenStore, TokenStoreError> {
        match &self.session.token_path {
            Some(path) => Ok(FileTokenStore::new(path)),
            None => FileTokenStore::default_location(),
        }
    }
}
