//! The contract between the reporter and whatever records its messages.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::Result;

/// Structured metadata attached to a message, label to value, in insertion order.
pub type Context = IndexMap<String, String>;

/// Log severity, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Level {
    #[default]
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Upper-case level name as it appears in log lines, e.g. `WARNING`.
    pub fn as_str_upper(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

/// A destination for formatted failure messages.
pub trait Sink {
    fn log(&self, level: Level, message: &str, context: &Context) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &S {
    fn log(&self, level: Level, message: &str, context: &Context) -> Result<()> {
        (**self).log(level, message, context)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn log(&self, level: Level, message: &str, context: &Context) -> Result<()> {
        (**self).log(level, message, context)
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn log(&self, level: Level, message: &str, context: &Context) -> Result<()> {
        (**self).log(level, message, context)
    }
}

/// One message on its way through the handler stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub channel: String,
    pub level: Level,
    pub message: String,
    pub context: Context,
    pub datetime: DateTime<Local>,
}

impl Record {
    pub fn new(channel: impl Into<String>, level: Level, message: impl Into<String>) -> Record {
        Record {
            channel: channel.into(),
            level,
            message: message.into(),
            context: Context::new(),
            datetime: Local::now(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Record {
        self.context = context;
        self
    }

    /// `[datetime] channel.LEVEL: message {context}`
    pub fn to_line(&self) -> Result<String> {
        let context = serde_json::to_string(&self.context)?;
        Ok(format!(
            "[{}] {}.{}: {} {}",
            self.datetime.format("%Y-%m-%dT%H:%M:%S%.6f%:z"),
            self.channel,
            self.level.as_str_upper(),
            self.message,
            if self.context.is_empty() {
                "[]"
            } else {
                context.as_str()
            },
        ))
    }
}
