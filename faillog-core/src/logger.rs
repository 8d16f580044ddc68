use tracing::*;

use crate::{
    handler::{self, Handler},
    sink::{Context, Level, Record, Sink},
    Config, Result,
};

/// A named channel that passes records to a stack of handlers.
pub struct Logger {
    channel: String,
    handlers: Vec<Box<dyn Handler>>,
}

impl Logger {
    pub fn new(channel: impl Into<String>) -> Logger {
        Logger {
            channel: channel.into(),
            handlers: Vec::new(),
        }
    }

    /// Build the logger and every configured handler, in configuration order.
    pub fn from_config(cfg: &Config) -> Result<Logger> {
        let mut logger = Logger::new(cfg.channel.clone());
        for (kind, args) in &cfg.handlers {
            logger.push_handler(handler::resolve(kind, args)?);
        }
        Ok(logger)
    }

    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Logger {
        self.push_handler(Box::new(handler));
        self
    }

    pub fn push_handler(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }
}

impl Sink for Logger {
    fn log(&self, level: Level, message: &str, context: &Context) -> Result<()> {
        if self.handlers.is_empty() {
            trace!("logger \"{}\" has no handlers, dropping record", self.channel);
            return Ok(());
        }

        let record =
            Record::new(self.channel.clone(), level, message).with_context(context.clone());
        for handler in self.handlers.iter().filter(|h| h.handles(level)) {
            handler.handle(&record)?;
        }
        Ok(())
    }
}
