//! Client configuration (`client.toml`).
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Only a file that exists and fails to parse is reported as an error.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{ForgeError, Result};
use crate::routes::DEFAULT_LANDING_ROUTE;

/// Overrides `api_url` when set.
pub const API_URL_ENV: &str = "SKILLFORGE_API_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_NOTIFICATION_AUTO_HIDE_MS: u64 = 6_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_notification_auto_hide_ms")]
    pub notification_auto_hide_ms: u64,
    #[serde(default = "default_landing_route")]
    pub default_landing_route: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            notification_auto_hide_ms: default_notification_auto_hide_ms(),
            default_landing_route: default_landing_route(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn notification_auto_hide(&self) -> Duration {
        Duration::from_millis(self.notification_auto_hide_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Applies environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api_url = url.to_string();
            }
        }
        self
    }
}

/// Loads the client configuration, returning defaults if the file doesn't exist.
pub fn load_client_config(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|err| ForgeError::io(format!("read {}", path.display()), err))?;
    toml::from_str::<ClientConfig>(&content).map_err(|err| ForgeError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_notification_auto_hide_ms() -> u64 {
    DEFAULT_NOTIFICATION_AUTO_HIDE_MS
}

fn default_landing_route() -> String {
    DEFAULT_LANDING_ROUTE.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
