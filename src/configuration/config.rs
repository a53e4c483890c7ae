use serde::Deserialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::configuration::types::ServiceOverride;
use crate::error_handling::types::ConfigError;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8099
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_runtime_timeout_secs() -> u64 {
    5
}

fn default_stats_timeout_secs() -> u64 {
    10
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Application settings, read from an optional TOML file.
///
/// Every field has a default so the binary runs with no configuration at
/// all; `[[services]]` entries extend or replace the built-in catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the web server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port for the dashboard and API.
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Seconds between reconciliation cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Timeout for individual runtime API calls.
    #[serde(default = "default_runtime_timeout_secs")]
    pub runtime_timeout_secs: u64,

    /// Timeout for per-container stats queries; these are slower than
    /// plain API calls because the daemon samples counters twice.
    #[serde(default = "default_stats_timeout_secs")]
    pub stats_timeout_secs: u64,

    /// Timeout for service lifecycle commands.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Directory lifecycle commands run in (where the Makefile lives).
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Additional or replacement service definitions.
    #[serde(default)]
    pub services: Vec<ServiceOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            web_port: default_web_port(),
            poll_interval_secs: default_poll_interval_secs(),
            runtime_timeout_secs: default_runtime_timeout_secs(),
            stats_timeout_secs: default_stats_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            work_dir: default_work_dir(),
            services: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file and validates them.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::BadBindAddress(self.bind_address.clone()));
        }
        if self.web_port < 1024 {
            return Err(ConfigError::BadPort(format!(
                "web_port {} is in the reserved range",
                self.web_port
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::BadInterval(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.runtime_timeout_secs == 0
            || self.stats_timeout_secs == 0
            || self.command_timeout_secs == 0
        {
            return Err(ConfigError::BadInterval(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        if !self.work_dir.is_dir() {
            return Err(ConfigError::DirectoryDoesNotExist(format!(
                "{:?}",
                self.work_dir
            )));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.service_id.as_str()) {
                return Err(ConfigError::DuplicateService(service.service_id.clone()));
            }
        }
        Ok(())
    }
}
