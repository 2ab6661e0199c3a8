//! Configuration loading and typed config structures for the Warden host.
//!
//! The canonical configuration lives in `warden-config.yaml` at the project
//! root. Every field has a serde default, so a partial file (or no file at
//! all) yields a runnable configuration.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use warden_world::StartingWorldSpec;

/// Environment variable overriding [`HostConfig::tick_interval_ms`].
pub const TICK_INTERVAL_ENV: &str = "WARDEN_TICK_INTERVAL_MS";

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

/// Top-level Warden configuration. Mirrors `warden-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WardenConfig {
    /// Simulation thread settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Tool gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Starting world generation.
    #[serde(default)]
    pub world: WorldConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `WARDEN_TICK_INTERVAL_MS` overrides `host.tick_interval_ms` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    /// (environment overrides still apply).
    ///
    /// # Errors
    ///
    /// Same as [`WardenConfig::from_file`] for an existing file.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.host.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.host.apply_env_overrides();
        Ok(config)
    }
}

/// Simulation thread configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Real-time milliseconds between ticks. Each tick drains the dispatch
    /// queue once.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl HostConfig {
    /// Override the tick interval from `WARDEN_TICK_INTERVAL_MS`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(TICK_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.tick_interval_ms = ms,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid tick interval override"),
            }
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
        }
    }
}

/// Tool gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    /// Serve read-only tools from the per-tick snapshot on the caller's
    /// thread instead of queueing them.
    #[serde(default)]
    pub snapshot_reads: bool,
}

/// Starting world configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Map width in cells.
    #[serde(default = "default_map_size")]
    pub width: u32,

    /// Map height in cells.
    #[serde(default = "default_map_size")]
    pub height: u32,

    /// Random seed for item placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of item stacks scattered at startup.
    #[serde(default = "default_item_count")]
    pub item_count: u32,
}

impl WorldConfig {
    /// The generator input for this configuration.
    pub const fn starting_world(&self) -> StartingWorldSpec {
        StartingWorldSpec {
            width: self.width,
            height: self.height,
            seed: self.seed,
            item_count: self.item_count,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_map_size(),
            height: default_map_size(),
            seed: default_seed(),
            item_count: default_item_count(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per log line instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_map_size() -> u32 {
    100
}

const fn default_seed() -> u64 {
    42
}

const fn default_item_count() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_owned()
}
