//! Configuration for the mailbox service
//!
//! Two layers feed the final [`Config`]:
//! 1. **TOML bootstrap** (`<config_dir>/writer-suite/mailbox.toml`), optional
//! 2. **Command line / environment** overrides (see `main.rs`)
//!
//! Anything not set in either layer falls back to a compiled default.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use wsc_common::config::LoggingConfig;
use wsc_common::{Error, Result};

/// Module name used for the config file and logs
pub const MODULE_NAME: &str = "mailbox";

/// Which [`crate::store::MailboxStore`] implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; entries are lost on restart
    #[default]
    Memory,
    /// Shared SQLite file
    Sqlite,
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub mailbox: MailboxSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mailbox: MailboxSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[mailbox]` table
#[derive(Debug, Clone, Deserialize)]
pub struct MailboxSection {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file; only read when `backend = "sqlite"`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// How long an unclaimed entry stays deliverable
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for MailboxSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: None,
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_ttl_secs() -> u64 {
    15 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_database_path() -> PathBuf {
    wsc_common::config::default_data_dir().join("mailbox.db")
}

/// Command-line / environment overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backend: Option<StoreBackend>,
    pub database_path: Option<PathBuf>,
    pub ttl_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_path: PathBuf,
    pub entry_ttl: Duration,
    pub sweep_interval: Duration,
    pub log_level: String,
}

impl Config {
    /// Merge overrides over the TOML layer and validate
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let ttl_secs = overrides.ttl_secs.unwrap_or(toml.mailbox.ttl_secs);
        if ttl_secs == 0 {
            return Err(Error::Config("mailbox.ttl_secs must be greater than zero".to_string()));
        }
        if toml.mailbox.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "mailbox.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host: overrides.host.unwrap_or(toml.host),
            port: overrides.port.unwrap_or(toml.port),
            backend: overrides.backend.unwrap_or(toml.mailbox.backend),
            database_path: overrides
                .database_path
                .or(toml.mailbox.database_path)
                .unwrap_or_else(default_database_path),
            entry_ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(toml.mailbox.sweep_interval_secs),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
