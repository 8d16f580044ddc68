//! # Configuration Module
//!
//! Handles loading faillog configuration from `faillog.toml`.
//!
//! ## Configuration Loading Flow (block diagram)
//!
//! ```text
//! +-------------------+     +-------------------+     +-------------------+
//! | FAILLOG_CONFIG    | --> | Path resolution   | --> | faillog.toml file |
//! | (optional)        |     | or default ./     |     | ./ absent=default |
//! +-------------------+     +-------------------+     +-------------------+
//!                                                              |
//!                                                              v
//! +-------------------+     +-------------------+     +-------------------+
//! | FAILLOG_MESSAGE   | --> | env overrides     | --> | Config struct     |
//! | FAILLOG_REPORT_URL|     | (validated again) |     | template, url,    |
//! | FAILLOG_CHANNEL   |     |                   |     | handlers (ordered)|
//! +-------------------+     +-------------------+     +-------------------+
//! ```
//!
//! ## Configuration Structure
//!
//! ```toml
//! channel = "tests"
//! message = "Test %s failed. \nMessage: %s.\nTrace: %s"
//! report_url = "http://ci.example.com/artifacts"
//! step_arguments = false
//!
//! [handlers.stream]
//! path = "stderr"
//! level = "warning"
//!
//! [handlers.tracing]
//! ```
//!
//! An empty `message` or `report_url` counts as unset. The message template
//! must carry exactly three `%s` slots (name, message, trace), and
//! `report_url` must be a valid URL; both are checked at load time.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::{io::Read, path::Path};
use toml::Value as TomlValue;
use tracing::*;
use url::Url;

use crate::{template::Template, Error, Result};

/// Environment variable name for specifying the config file path.
const FAILLOG_CONFIG_ENV: &str = "FAILLOG_CONFIG";

/// Config file looked up in the current directory when `FAILLOG_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "faillog.toml";

const DEFAULT_CHANNEL: &str = "tests";

/// faillog's configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Channel name of the logger.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Template of the logged message.
    #[serde(
        default,
        alias = "messageFormat",
        alias = "message_format",
        deserialize_with = "deserialize_message"
    )]
    pub message: Template,
    /// Base URL where report artifacts are published. Links are attached only when set.
    #[serde(default, deserialize_with = "deserialize_report_url")]
    pub report_url: Option<Url>,
    /// Humanize the failing step together with its arguments.
    #[serde(default)]
    pub step_arguments: bool,
    /// Handler type to constructor arguments, in declaration order.
    #[serde(default)]
    pub handlers: IndexMap<String, TomlValue>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel: default_channel(),
            message: Template::default(),
            report_url: None,
            step_arguments: false,
            handlers: IndexMap::new(),
        }
    }
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn deserialize_message<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Template, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.is_empty() => Template::parse(s).map_err(serde::de::Error::custom),
        _ => Ok(Template::default()),
    }
}

fn deserialize_report_url<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Url>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.is_empty() => Url::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl Config {
    /// Load faillog configuration from path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Config> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| Error::LoadError(format!("failed to open {}: {e}", path.display())))?;

        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .map_err(|e| Error::LoadError(e.to_string()))?;

        let mut cfg: Config = toml::from_str(&buf).map_err(|e| {
            Error::LoadError(format!(
                "failed to deserialize {} into faillog::Config: {e}",
                path.display()
            ))
        })?;

        debug!("{} was successfully loaded: {cfg:#?}", path.display());

        cfg.load_env()?;

        Ok(cfg)
    }

    /// Load faillog configuration.
    ///
    /// Loading order:
    /// 1. If `FAILLOG_CONFIG` env var is set, load from that path, which must exist
    /// 2. Otherwise, load from `faillog.toml` in the current directory, falling
    ///    back to the defaults when there is none
    pub fn load() -> Result<Config> {
        let _ = dotenv::dotenv();
        match std::env::var(FAILLOG_CONFIG_ENV) {
            Ok(path) => {
                let path = Path::new(&path);
                if !path.exists() {
                    return Err(Error::LoadError(format!(
                        "config file specified by {FAILLOG_CONFIG_ENV} not found: {path:?}"
                    )));
                }

                debug!("Loading config from {FAILLOG_CONFIG_ENV}={path:?}");
                Config::load_from(path)
            }
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    return Config::load_from(path);
                }
                debug!("{DEFAULT_CONFIG_PATH} not found, using the default configuration");
                let mut cfg = Config::default();
                cfg.load_env()?;
                Ok(cfg)
            }
        }
    }

    /// Override settings from `FAILLOG_MESSAGE`, `FAILLOG_REPORT_URL` and
    /// `FAILLOG_CHANNEL`. Empty values are ignored.
    fn load_env(&mut self) -> Result<()> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(message) = var("FAILLOG_MESSAGE") {
            self.message = Template::parse(message)?;
        }
        if let Some(report_url) = var("FAILLOG_REPORT_URL") {
            self.report_url = Some(Url::parse(&report_url)?);
        }
        if let Some(channel) = var("FAILLOG_CHANNEL") {
            self.channel = channel;
        }

        debug!("faillog configuration loaded from env: {self:#?}");
        Ok(())
    }
}
