// Bridge configuration
//
// TOML file (optional) first, then SAFE_AI_UTIL_* environment variables on
// top. Default location: <platform config dir>/safe-ai-util-mcp/config.toml.

use crate::gateway::DEFAULT_TIMEOUT_SECS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the delegated binary identifier
pub const ENV_BINARY: &str = "SAFE_AI_UTIL_BIN";

/// Overrides the default invocation timeout (seconds)
pub const ENV_TIMEOUT: &str = "SAFE_AI_UTIL_TIMEOUT";

pub const ENV_LOG_LEVEL: &str = "SAFE_AI_UTIL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SAFE_AI_UTIL_LOG_FORMAT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Gateway configuration
    pub gateway: GatewayConfig,

    /// Environment overrides that were rejected while loading, for logging
    /// once the subscriber is installed
    #[serde(skip)]
    pub ignored_overrides: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Explicit binary identifier; skips search-path probing when set
    pub binary: Option<String>,

    /// Default timeout in seconds for one invocation
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the default config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// either way, then the result is validated.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load_from_path`] with an explicit variable lookup
    pub fn load_with<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();

        let config = match fs::read_to_string(path) {
            Ok(content) => {
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?;
                tracing::debug!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file {:?}", path))
            }
        };

        let config = config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "safe-ai-util-mcp") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("safe-ai-util-mcp")
                .join("config.toml")
        }
    }

    /// Apply SAFE_AI_UTIL_BIN, SAFE_AI_UTIL_TIMEOUT, SAFE_AI_UTIL_LOG_LEVEL and
    /// SAFE_AI_UTIL_LOG_FORMAT from `lookup`
    ///
    /// Empty values are ignored. A timeout that is not a positive integer is
    /// ignored and described in [`Config::ignored_overrides`].
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(binary) = get(ENV_BINARY) {
            self.gateway.binary = Some(binary);
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.gateway.timeout_secs = secs,
                _ => self.ignored_overrides.push(format!(
                    "Ignoring invalid {}={:?}, keeping {}s",
                    ENV_TIMEOUT, timeout, self.gateway.timeout_secs
                )),
            }
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.logging.format = format;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.gateway.timeout_secs == 0 {
            anyhow::bail!("Gateway timeout must be > 0 seconds");
        }

        Ok(())
    }
}
