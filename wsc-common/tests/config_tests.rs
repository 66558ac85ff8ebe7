//! Tests for configuration loading and graceful degradation
//!
//! - Missing TOML files SHALL NOT cause termination
//! - Unparsable TOML files are reported as configuration errors
//! - `WSC_CONFIG` selects the file when no CLI path is given
//! - The reported source matches what was actually read
//!
//! Tests touching environment variables are marked #[serial].

use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use wsc_common::config::{
    load_toml_or_default, resolve_config_path, ConfigSource, LoggingConfig, CONFIG_ENV_VAR,
};
use wsc_common::Error;

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_missing_file_uses_defaults() {
    let path = PathBuf::from("/nonexistent/writer-suite/mailbox.toml");
    let (config, source): (SampleConfig, _) = load_toml_or_default(Some(path.as_path())).unwrap();
    assert_eq!(config, SampleConfig::default());
    assert_eq!(source, ConfigSource::Missing(path));
}

#[test]
fn test_loads_toml_values() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = 6000\n\n[logging]\nlevel = \"debug\"").unwrap();

    let (config, source): (SampleConfig, _) = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.port, Some(6000));
    assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_partial_logging_section_defaults_level() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[logging]").unwrap();

    let (config, _): (SampleConfig, _) = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    let result: Result<(SampleConfig, ConfigSource), Error> = load_toml_or_default(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/wsc-from-env.toml");

    let path = resolve_config_path(None, "mailbox");
    assert_eq!(path, Some(PathBuf::from("/tmp/wsc-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_no_config_dir_uses_defaults() {
    let (config, source): (SampleConfig, _) = load_toml_or_default(None).unwrap();
    assert_eq!(config, SampleConfig::default());
    assert_eq!(source, ConfigSource::Unavailable);
}
