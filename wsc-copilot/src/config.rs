//! Configuration for the copilot client
//!
//! Same layering as the mailbox service: TOML bootstrap
//! (`<config_dir>/writer-suite/copilot.toml`), then command line /
//! environment overrides, then compiled defaults.

use std::time::Duration;

use serde::Deserialize;
use wsc_common::config::LoggingConfig;
use wsc_common::{CallbackKind, Error, Result};

use crate::poller::PollPolicy;

/// Module name used for the config file and logs
pub const MODULE_NAME: &str = "copilot";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Where the client polls for results
    #[serde(default = "default_mailbox_url")]
    pub mailbox_url: String,

    /// Base the workflow engine calls back to; defaults to `mailbox_url`
    #[serde(default)]
    pub callback_base_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub webhooks: WebhooksSection,

    #[serde(default)]
    pub poll: PollSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            mailbox_url: default_mailbox_url(),
            callback_base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            webhooks: WebhooksSection::default(),
            poll: PollSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[webhooks]` table: one workflow URL per callback kind
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WebhooksSection {
    pub content: Option<String>,
    pub example: Option<String>,
    pub generation: Option<String>,
    pub assistant: Option<String>,
}

impl WebhooksSection {
    /// Webhook configured for `kind`, ignoring blank entries
    pub fn url_for(&self, kind: CallbackKind) -> Option<&str> {
        let url = match kind {
            CallbackKind::Content => self.content.as_deref(),
            CallbackKind::Example => self.example.as_deref(),
            CallbackKind::Generation => self.generation.as_deref(),
            CallbackKind::Assistant => self.assistant.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn set(&mut self, kind: CallbackKind, url: String) {
        let slot = match kind {
            CallbackKind::Content => &mut self.content,
            CallbackKind::Example => &mut self.example,
            CallbackKind::Generation => &mut self.generation,
            CallbackKind::Assistant => &mut self.assistant,
        };
        *slot = Some(url);
    }
}

/// `[poll]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PollSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_transport_errors")]
    pub max_transport_errors: u32,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            max_transport_errors: default_max_transport_errors(),
        }
    }
}

fn default_mailbox_url() -> String {
    "http://127.0.0.1:5790".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    1500
}

fn default_max_attempts() -> u32 {
    30
}

fn default_max_transport_errors() -> u32 {
    3
}

/// Command-line / environment overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mailbox_url: Option<String>,
    pub callback_base_url: Option<String>,
    /// Webhook for the kind being requested
    pub webhook: Option<(CallbackKind, String)>,
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub log_level: Option<String>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mailbox_url: String,
    pub callback_base_url: String,
    pub request_timeout: Duration,
    pub webhooks: WebhooksSection,
    pub poll: PollPolicy,
    pub log_level: String,
}

impl Config {
    /// Merge overrides over the TOML layer and validate
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let mailbox_url = overrides.mailbox_url.unwrap_or(toml.mailbox_url);
        if mailbox_url.trim().is_empty() {
            return Err(Error::Config("mailbox_url must not be empty".to_string()));
        }

        let callback_base_url = overrides
            .callback_base_url
            .or(toml.callback_base_url)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| mailbox_url.clone());

        if toml.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let interval_ms = overrides.interval_ms.unwrap_or(toml.poll.interval_ms);
        let max_attempts = overrides.max_attempts.unwrap_or(toml.poll.max_attempts);
        if max_attempts == 0 {
            return Err(Error::Config("poll.max_attempts must be at least 1".to_string()));
        }
        if toml.poll.max_transport_errors == 0 {
            return Err(Error::Config(
                "poll.max_transport_errors must be at least 1".to_string(),
            ));
        }

        let mut webhooks = toml.webhooks;
        if let Some((kind, url)) = overrides.webhook {
            webhooks.set(kind, url);
        }

        Ok(Self {
            mailbox_url,
            callback_base_url,
            request_timeout: Duration::from_secs(toml.request_timeout_secs),
            webhooks,
            poll: PollPolicy {
                interval: wsc_common::time::millis_to_duration(interval_ms),
                max_attempts,
                max_transport_errors: toml.poll.max_transport_errors,
            },
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let config = Config::resolve(TomlConfig::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(config.mailbox_url, "http://127.0.0.1:5790");
        assert_eq!(config.callback_base_url, config.mailbox_url);
        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, "info");
        assert!(config.webhooks.url_for(CallbackKind::Generation).is_none());
    }

    #[test]
    fn test_toml_sections_parse() {
        let toml: TomlConfig = toml::from_str(
            r#"
            mailbox_url = "http://mailbox.internal:5790"
            callback_base_url = "https://public.example.com"

            [webhooks]
            generation = "https://n8n.example.com/webhook/generate"
            content = "   "

            [poll]
            interval_ms = 500
            max_attempts = 10
            "#,
        )
        .unwrap();

        let config = Config::resolve(toml, ConfigOverrides::default()).unwrap();
        assert_eq!(config.callback_base_url, "https://public.example.com");
        assert_eq!(
            config.webhooks.url_for(CallbackKind::Generation),
            Some("https://n8n.example.com/webhook/generate")
        );
        assert_eq!(config.webhooks.url_for(CallbackKind::Content), None);
        assert_eq!(config.poll.interval, Duration::from_millis(500));
        assert_eq!(config.poll.max_attempts, 10);
        assert_eq!(config.poll.max_transport_errors, 3);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::resolve(
            TomlConfig::default(),
            ConfigOverrides {
                mailbox_url: Some("http://other:1".to_string()),
                webhook: Some((CallbackKind::Assistant, "http://hook".to_string())),
                max_attempts: Some(5),
                log_level: Some("debug".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.mailbox_url, "http://other:1");
        assert_eq!(config.callback_base_url, "http://other:1");
        assert_eq!(config.webhooks.url_for(CallbackKind::Assistant), Some("http://hook"));
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = Config::resolve(
            TomlConfig::default(),
            ConfigOverrides {
                max_attempts: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
