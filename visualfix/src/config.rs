// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::session::DEFAULT_SESSION_COOKIE;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub host: HostConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub host: ValidatedHostConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl ServerConfig {
    pub fn address_tuple(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    /// Path prefix the host is served under, e.g. `/glpi`. Empty for the
    /// web root.
    #[serde(default)]
    pub root_doc: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HostConfig {
    pub root: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

#[derive(Debug, Clone)]
pub struct ValidatedHostConfig {
    pub root: PathBuf,
    pub session_cookie: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default)]
    pub observe_character_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            refresh_delay_ms: default_refresh_delay_ms(),
            refresh_path: default_refresh_path(),
            observe_character_data: false,
            lookup_url: None,
        }
    }
}

impl ClientConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_refresh_delay_ms() -> u64 {
    100
}

fn default_refresh_path() -> String {
    "/ajax/kanban.php".to_string()
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        let config = Self::load(root)?;
        config.validate(root)
    }

    pub fn validate(self, root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_app(&self.app)?;
        Self::validate_logging(&self.logging)?;
        Self::validate_client(&self.client)?;

        if self.server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }

        let host = Self::validate_host(&self.host, root)?;

        Ok(ValidatedConfig {
            server: self.server,
            app: self.app,
            logging: self.logging,
            host,
            client: self.client,
        })
    }

    fn validate_app(app: &AppConfig) -> Result<(), ConfigError> {
        let root_doc = &app.root_doc;
        if root_doc.is_empty() {
            return Ok(());
        }
        if !root_doc.starts_with('/') || root_doc.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "app.root_doc must start with '/' and not end with '/', got: '{}'",
                root_doc
            )));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got: '{}'",
                LOG_LEVELS.join(", "),
                logging.level
            )));
        }
        Ok(())
    }

    fn validate_client(client: &ClientConfig) -> Result<(), ConfigError> {
        if client.refresh_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "client.refresh_path must not be empty".to_string(),
            ));
        }
        if let Some(url) = &client.lookup_url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "client.lookup_url must be a fully qualified URL starting with http:// or https://, got: '{}'",
                url
            )));
        }
        Ok(())
    }

    fn validate_host(host: &HostConfig, root: &Path) -> Result<ValidatedHostConfig, ConfigError> {
        if host.root.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "host.root must name the host installation directory".to_string(),
            ));
        }
        let cookie = host.session_cookie.trim();
        if cookie.is_empty()
            || cookie
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '='))
        {
            return Err(ConfigError::ValidationError(format!(
                "host.session_cookie is not a valid cookie name: '{}'",
                host.session_cookie
            )));
        }

        let configured = PathBuf::from(&host.root);
        let resolved = if configured.is_absolute() {
            configured
        } else {
            root.join(configured)
        };
        if resolved.exists() && !resolved.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "host.root is not a directory: {}",
                resolved.display()
            )));
        }
        if !resolved.exists() {
            log::warn!(
                "Host installation directory does not exist yet: {}",
                resolved.display()
            );
        }

        Ok(ValidatedHostConfig {
            root: resolved,
            session_cookie: cookie.to_string(),
        })
    }
}

impl ValidatedConfig {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }
}
