//! Harness Configuration
//!
//! Loaded from `netveil.toml`. Every section is optional and falls back to
//! its default.

use netveil_bodystore::DEFAULT_AUTHORITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path used when no config file is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "netveil.toml";

/// Block-list sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockListConfig {
    /// One hostname per line
    pub hosts_path: PathBuf,
    /// One normalized URL per line
    pub urls_path: PathBuf,
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self {
            hosts_path: PathBuf::from("lists/blocked_hosts.txt"),
            urls_path: PathBuf::from("lists/blocked_urls.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyStoreConfig {
    /// Authority segment of body URIs
    pub authority: String,
}

impl Default for BodyStoreConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events queued per observer before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Identity stamped on every request the harness issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerConfig {
    pub package_name: String,
    pub display_name: String,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            package_name: "dev.netveil.harness".to_string(),
            display_name: "netveil".to_string(),
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_level: String,
    pub blocklist: BlockListConfig,
    pub bodystore: BodyStoreConfig,
    pub events: EventsConfig,
    pub caller: CallerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            blocklist: BlockListConfig::default(),
            bodystore: BodyStoreConfig::default(),
            events: EventsConfig::default(),
            caller: CallerConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocklist.hosts_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("blocklist.hosts_path"));
        }
        if self.blocklist.urls_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("blocklist.urls_path"));
        }
        if self.bodystore.authority.trim().is_empty() {
            return Err(ConfigError::EmptyAuthority);
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    #[error("Body store authority must not be empty")]
    EmptyAuthority,

    #[error("Event channel capacity must be at least 1")]
    ZeroCapacity,
}
