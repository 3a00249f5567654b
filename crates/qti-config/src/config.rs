//! Client configuration.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_API_URL: &str = "https://api.qti-delivery.dev/";
pub const DEFAULT_APP_ID: &str = "default";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration of the command-line client.
///
/// Read from `config.json` in the base directory; `QTI_LOG_LEVEL`,
/// `QTI_API_URL`, `QTI_APP_ID` and `QTI_FIREBASE_API_KEY` override the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// Web API key of the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_api_key: Option<String>,
    /// Send `x-admin: true` with teacher and tools requests.
    #[serde(default)]
    pub admin: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Credential file; defaults to `credentials.json` in the base directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_url: default_api_url(),
            app_id: default_app_id(),
            firebase_api_key: None,
            admin: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credentials_file: None,
        }
    }
}

impl Config {
    /// Load from the config file when present, then apply the environment.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply `QTI_*` overrides; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(level) = get("QTI_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = get("QTI_API_URL") {
            self.api_url = url;
        }
        if let Some(app_id) = get("QTI_APP_ID") {
            self.app_id = app_id;
        }
        if let Some(key) = get("QTI_FIREBASE_API_KEY") {
            self.firebase_api_key = Some(key);
        }
    }

    /// Parsed API base URL, with a trailing slash so relative paths resolve
    /// below it.
    pub fn api_url(&self) -> ConfigResult<Url> {
        let mut raw = self.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn firebase_api_key(&self) -> ConfigResult<&str> {
        self.firebase_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "firebase_api_key is not set (config file or QTI_FIREBASE_API_KEY)"
                        .to_string(),
                )
            })
    }

    pub fn credentials_file(&self, paths: &Paths) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| paths.credentials_file())
    }
}
