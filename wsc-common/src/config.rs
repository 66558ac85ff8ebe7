//! Configuration file resolution and loading
//!
//! Both binaries follow the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not fatal: a warning is logged and compiled defaults
//! are used. A TOML file that exists but does not parse is a configuration error.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WSC_CONFIG";

/// Directory under the platform config dir holding per-module TOML files
const CONFIG_DIR_NAME: &str = "writer-suite";

/// Logging configuration shared by both binaries
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Default TOML location for a module: `<config_dir>/writer-suite/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(format!("{}.toml", module_name)))
}

/// Pick the config file to read: CLI path, then `WSC_CONFIG`, then the default location
pub fn resolve_config_path(cli_path: Option<&Path>, module_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path(module_name)
}

/// Where a loaded configuration came from
///
/// Returned alongside the config so callers can report it once logging is up.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// File was absent; compiled defaults in use
    Missing(PathBuf),
    /// No config directory on this platform; compiled defaults in use
    Unavailable,
}

impl ConfigSource {
    /// Report the source through `tracing`
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {}, using compiled defaults",
                path.display()
            ),
            ConfigSource::Unavailable => {
                warn!("No config directory available on this platform, using compiled defaults")
            }
        }
    }
}

/// Load a TOML config, falling back to `T::default()` when the file is missing
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<(T, ConfigSource)>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok((T::default(), ConfigSource::Unavailable));
    };

    if !path.exists() {
        return Ok((T::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Default directory for persistent data: `<data_local_dir>/writer-suite`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./writer-suite-data"))
}
