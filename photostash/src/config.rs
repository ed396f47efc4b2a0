//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! `PHOTOSTASH_CONFIG` environment variable. A missing file is not an error: the service is usually
//! configured purely through the environment.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PHOTOSTASH_` override YAML values
//! 3. **Bot variables** - `TELEGRAM_TOKEN`, `GROUP_ID` and `WEBHOOK_URL` without prefix
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PHOTOSTASH_TELEGRAM__API_BASE=http://localhost:8081` sets the `telegram.api_base` field.
//!
//! The bot token, allowed group id and public webhook URL have no defaults: [`Config::load`] fails
//! if any of them is missing, and the process does not start.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! TELEGRAM_TOKEN="123456:ABC-DEF"
//! GROUP_ID="-1001234567890"
//! WEBHOOK_URL="https://photos.example.com"
//!
//! # Override server port and storage location
//! PHOTOSTASH_PORT=8080
//! PHOTOSTASH_IMAGES_DIR=/var/lib/photostash/images
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::errors::Error;
use crate::telegram::DEFAULT_API_BASE;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PHOTOSTASH_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory holding the deduplicated images
    pub images_dir: PathBuf,
    /// Marker file claimed by the instance that owns the webhook
    pub lock_file: PathBuf,
    /// Bot access token (required)
    #[serde(skip_serializing)]
    pub telegram_token: Option<String>,
    /// The only chat whose photos are collected (required)
    #[serde(deserialize_with = "string_or_number")]
    pub group_id: Option<String>,
    /// Public base URL of this service; the webhook is registered at `<webhook_url>/bot<token>` (required)
    pub webhook_url: Option<String>,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API base URL, overridable for a local Bot API server
    pub api_base: Url,
    /// Call `deleteWebhook` when a running bot shuts down
    pub delete_webhook_on_shutdown: bool,
}

/// Chat ids are numeric, and figment parses numeric-looking env values as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::String(s) => s,
        Raw::Int(i) => i.to_string(),
    }))
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            delete_webhook_on_shutdown: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            images_dir: PathBuf::from("images"),
            lock_file: PathBuf::from("bot.lock"),
            telegram_token: None,
            group_id: None,
            webhook_url: None,
            telegram: TelegramConfig::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("TELEGRAM_TOKEN", &self.telegram_token),
            ("GROUP_ID", &self.group_id),
            ("WEBHOOK_URL", &self.webhook_url),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Internal {
                operation: format!(
                    "validate config: Telegram token, group ID, and webhook URL must be set (missing: {})",
                    missing.join(", ")
                ),
            });
        }

        if let Some(webhook_url) = &self.webhook_url {
            Url::parse(webhook_url).map_err(|e| Error::Internal {
                operation: format!("validate config: WEBHOOK_URL {webhook_url:?} is not a valid URL: {e}"),
            })?;
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("PHOTOSTASH_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["TELEGRAM_TOKEN", "GROUP_ID", "WEBHOOK_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token(&self) -> &str {
        self.telegram_token.as_deref().unwrap_or_default()
    }

    pub fn group_id(&self) -> &str {
        self.group_id.as_deref().unwrap_or_default()
    }

    /// Route the platform delivers updates to. The token in the path keeps it unguessable.
    pub fn webhook_path(&self) -> String {
        format!("/bot{}", self.token())
    }

    /// Full URL registered with the platform.
    pub fn webhook_endpoint(&self) -> String {
        let base = self.webhook_url.as_deref().unwrap_or_default().trim_end_matches('/');
        format!("{}{}", base, self.webhook_path())
    }
}
