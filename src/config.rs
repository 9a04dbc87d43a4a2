// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Settings persist as TOML through `confy`. Missing keys fall back to their
//! defaults, so older files keep loading as fields are added. Feed
//! credentials may also come from the environment, which takes precedence
//! over the file.

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use skywatch_core::client::DEFAULT_RELAY_URL;
use skywatch_core::region::RegionError;
use skywatch_core::{BoundingBox, ClientConfig, SessionConfig};

const APP_NAME: &str = "skywatch";
const CONFIG_NAME: &str = "config";

/// Current configuration schema version
const CONFIG_VERSION: u32 = 1;

pub const USERNAME_ENV: &str = "OPENSKY_USERNAME";
pub const PASSWORD_ENV: &str = "OPENSKY_PASSWORD";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Relay endpoint that forwards state-vector queries upstream
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Feed username (optional, env var takes precedence)
    #[serde(default)]
    pub username: Option<String>,

    /// Feed password (optional, env var takes precedence)
    #[serde(default)]
    pub password: Option<String>,

    /// Seconds between polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum aircraft drawn per snapshot
    #[serde(default = "default_display_budget")]
    pub display_budget: usize,

    /// Seconds without interaction before polling pauses
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Drop snapshots that arrive after polling paused
    #[serde(default)]
    pub discard_results_while_idle: bool,

    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    /// Radius of the default query region
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    CONFIG_VERSION
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_display_budget() -> usize {
    skywatch_core::DEFAULT_DISPLAY_BUDGET
}

fn default_idle_timeout_secs() -> u64 {
    60
}

// London
fn default_latitude() -> f64 {
    51.5074
}

fn default_longitude() -> f64 {
    -0.1278
}

fn default_radius_km() -> f64 {
    100.0
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            relay_url: default_relay_url(),
            username: None,
            password: None,
            poll_interval_secs: default_poll_interval_secs(),
            display_budget: default_display_budget(),
            idle_timeout_secs: default_idle_timeout_secs(),
            discard_results_while_idle: false,
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            default_radius_km: default_radius_km(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, upgrading older schema versions
    pub fn load() -> Result<Self, confy::ConfyError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;

        if config.config_version < CONFIG_VERSION {
            info!(
                "Upgrading configuration from version {} to {}",
                config.config_version, CONFIG_VERSION
            );
            config.config_version = CONFIG_VERSION;
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve credentials from environment variables or config
    pub fn credentials(&self) -> Option<(String, String)> {
        self.resolve_credentials(|name| std::env::var(name).ok())
    }

    fn resolve_credentials(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<(String, String)> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        // Check environment variables first
        if let (Some(username), Some(password)) =
            (non_empty(env(USERNAME_ENV)), non_empty(env(PASSWORD_ENV)))
        {
            return Some((username, password));
        }

        // Fall back to config
        match (
            non_empty(self.username.clone()),
            non_empty(self.password.clone()),
        ) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    /// Where credentials came from, for status display
    pub fn credentials_source(&self) -> Option<&'static str> {
        let env_set = |name| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
        if env_set(USERNAME_ENV) && env_set(PASSWORD_ENV) {
            Some("environment variables")
        } else if self.credentials().is_some() {
            Some("config file")
        } else {
            None
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.relay_url.clone(),
            min_poll_interval: Duration::from_secs(self.poll_interval_secs),
            ..ClientConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_frequency_ticks: u32::try_from(self.poll_interval_secs).unwrap_or(u32::MAX),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            display_budget: self.display_budget,
            discard_results_while_idle: self.discard_results_while_idle,
            ..SessionConfig::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Query region around the configured default location
    pub fn default_region(&self) -> Result<BoundingBox, RegionError> {
        BoundingBox::around(
            self.default_latitude,
            self.default_longitude,
            self.default_radius_km,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: AppConfig = toml_from_str("relay_url = \"http://relay:8080\"\n");
        assert_eq!(config.relay_url, "http://relay:8080");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.display_budget, 750);
        assert_eq!(config.idle_timeout_secs, 60);
        assert!(!config.discard_results_while_idle);
        assert_eq!(config.config_version, CONFIG_VERSION);
    }

    fn toml_from_str(text: &str) -> AppConfig {
        // confy only exposes file I/O, so go through a temporary file.
        let path = std::env::temp_dir().join(format!(
            "skywatch-config-test-{}-{}.toml",
            std::process::id(),
            text.len()
        ));
        std::fs::write(&path, text).unwrap();
        let config = confy::load_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        config
    }

    #[test]
    fn test_env_credentials_take_precedence() {
        let config = AppConfig {
            username: Some("file-user".to_string()),
            password: Some("file-pass".to_string()),
            ..AppConfig::default()
        };

        let env = env_with(&[(USERNAME_ENV, "env-user"), (PASSWORD_ENV, "env-pass")]);
        assert_eq!(
            config.resolve_credentials(env),
            Some(("env-user".to_string(), "env-pass".to_string()))
        );

        let env = env_with(&[(USERNAME_ENV, "env-user")]);
        assert_eq!(
            config.resolve_credentials(env),
            Some(("file-user".to_string(), "file-pass".to_string()))
        );
    }

    #[test]
    fn test_blank_credentials_are_none() {
        let config = AppConfig {
            username: Some(String::new()),
            password: Some("secret".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.resolve_credentials(env_with(&[])), None);
    }

    #[test]
    fn test_library_configs() {
        let config = AppConfig {
            poll_interval_secs: 10,
            display_budget: 100,
            discard_results_while_idle: true,
            ..AppConfig::default()
        };

        let client = config.client_config();
        assert_eq!(client.min_poll_interval, Duration::from_secs(10));
        assert_eq!(client.base_url, DEFAULT_RELAY_URL);

        let session = config.session_config();
        assert_eq!(session.poll_frequency_ticks, 10);
        assert_eq!(session.display_budget, 100);
        assert!(session.discard_results_while_idle);
    }

    #[test]
    fn test_default_region_is_centered() {
        let region = AppConfig::default().default_region().unwrap();
        let (lat, lon) = region.center();
        assert!((lat - 51.5074).abs() < 1e-9);
        assert!((lon + 0.1278).abs() < 1e-9);
    }
}
