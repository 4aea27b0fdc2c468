//! Configuration loading and typed config structures for Conduit.
//!
//! The canonical configuration lives in `conduit-config.yaml` at the project
//! root. Every section and field is optional; missing values fall back to
//! the defaults below.
//!
//! The disabled-side store path can be overridden with the
//! `CONDUIT_OVERRIDES_PATH` environment variable.

use std::path::{Path, PathBuf};

use conduit_network::{DEFAULT_NODE_LIMIT, ManagerConfig};
use serde::Deserialize;

/// Environment variable overriding [`OverridesConfig::path`].
pub const OVERRIDES_PATH_ENV: &str = "CONDUIT_OVERRIDES_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `conduit-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConduitConfig {
    /// Discovery and extraction settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Tick loop bounds and pacing.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// World identity.
    #[serde(default)]
    pub world: WorldConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Disabled-side store settings.
    #[serde(default)]
    pub overrides: OverridesConfig,
}

impl ConduitConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.overrides.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. Environment overrides are
    /// not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Network manager settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
    /// Maximum cables visited per discovery.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Whether foreign storage endpoints are used.
    #[serde(default = "default_true")]
    pub external_endpoints: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            external_endpoints: default_true(),
        }
    }
}

impl From<NetworkConfig> for ManagerConfig {
    fn from(config: NetworkConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            external_endpoints: config.external_endpoints,
        }
    }
}

/// Tick loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Stop after this many ticks. 0 runs until interrupted.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// World identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// World (dimension) name used for every position.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed recorded alongside runs for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Disabled-side store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverridesConfig {
    /// JSON file holding per-cable disabled sides.
    #[serde(default = "default_overrides_path")]
    pub path: PathBuf,
}

impl OverridesConfig {
    /// Replace the store path with `CONDUIT_OVERRIDES_PATH` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_path_override(std::env::var(OVERRIDES_PATH_ENV).ok());
    }

    /// Replace the store path with `value` unless it is absent or blank.
    pub fn apply_path_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|path| !path.trim().is_empty()) {
            self.path = PathBuf::from(path);
        }
    }
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            path: default_overrides_path(),
        }
    }
}

const fn default_max_nodes() -> usize {
    DEFAULT_NODE_LIMIT
}

const fn default_true() -> bool {
    true
}

const fn default_max_ticks() -> u64 {
    20
}

const fn default_tick_interval_ms() -> u64 {
    250
}

fn default_world_name() -> String {
    "overworld".to_owned()
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_overrides_path() -> PathBuf {
    PathBuf::from("conduit-sides.json")
}
