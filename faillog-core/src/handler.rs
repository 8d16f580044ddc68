//! Log handlers and the factory that builds them from configuration.
//!
//! Handlers are configured in `faillog.toml` as an ordered table of
//! handler type to constructor arguments:
//!
//! ```toml
//! [handlers.stream]
//! path = "/var/log/tests.log"
//! level = "warning"
//!
//! [handlers.tracing]
//! ```
//!
//! Both the short name (`stream`) and the class-like name (`StreamHandler`)
//! are accepted.

use console::{style, Term};
use serde::Deserialize;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
    str::FromStr,
    sync::Mutex,
};
use toml::Value as TomlValue;
use tracing::*;

use crate::{
    sink::{Level, Record},
    Error, Result,
};

/// Receives records from a [`Logger`](crate::logger::Logger).
pub trait Handler: Send + Sync {
    /// Minimum level this handler accepts.
    fn level(&self) -> Level;

    fn handles(&self, level: Level) -> bool {
        level >= self.level()
    }

    fn handle(&self, record: &Record) -> Result<()>;

    /// Short description used when listing the handler chain.
    fn describe(&self) -> String;
}

/// Handler types known to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum HandlerKind {
    #[strum(to_string = "stream", serialize = "StreamHandler")]
    Stream,
    #[strum(to_string = "console", serialize = "ConsoleHandler")]
    Console,
    #[strum(to_string = "tracing", serialize = "TracingHandler")]
    Tracing,
    #[strum(to_string = "null", serialize = "NullHandler")]
    Null,
    #[strum(to_string = "test", serialize = "TestHandler")]
    Test,
}

/// Build a handler from its type identifier and constructor arguments.
pub fn resolve(kind: &str, args: &TomlValue) -> Result<Box<dyn Handler>> {
    let handler_kind =
        HandlerKind::from_str(kind).map_err(|_| Error::UnknownHandler(kind.to_string()))?;
    let args = match args {
        TomlValue::Table(_) => args.clone(),
        _ => TomlValue::Table(Default::default()),
    };
    let invalid = |source| Error::InvalidHandlerArgs {
        handler: kind.to_string(),
        source,
    };

    debug!("resolving log handler \"{handler_kind}\" with {args}");
    let handler: Box<dyn Handler> = match handler_kind {
        HandlerKind::Stream => Box::new(StreamHandler::new(args.try_into().map_err(invalid)?)?),
        HandlerKind::Console => Box::new(ConsoleHandler::new(args.try_into().map_err(invalid)?)),
        HandlerKind::Tracing => Box::new(TracingHandler::new(args.try_into().map_err(invalid)?)),
        HandlerKind::Null => Box::new(NullHandler),
        HandlerKind::Test => Box::new(TestHandler::new(args.try_into().map_err(invalid)?)),
    };
    Ok(handler)
}

/// Arguments shared by handlers that only take a threshold.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelArgs {
    #[serde(default)]
    pub level: Level,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamArgs {
    /// `stdout`, `stderr` or a file path.
    #[serde(default = "default_stream_path")]
    pub path: String,
    #[serde(default)]
    pub level: Level,
}

fn default_stream_path() -> String {
    "stderr".to_string()
}

enum Target {
    Stdout,
    Stderr,
    File(PathBuf, Mutex<File>),
}

/// Writes one line per record to stdout, stderr or a file.
pub struct StreamHandler {
    target: Target,
    level: Level,
}

impl StreamHandler {
    pub fn new(args: StreamArgs) -> Result<StreamHandler> {
        let target = match args.path.as_str() {
            "stdout" | "php://stdout" => Target::Stdout,
            "stderr" | "php://stderr" => Target::Stderr,
            path => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Target::File(PathBuf::from(path), Mutex::new(file))
            }
        };
        Ok(StreamHandler {
            target,
            level: args.level,
        })
    }
}

impl Handler for StreamHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let line = record.to_line()?;
        match &self.target {
            Target::Stdout => writeln!(std::io::stdout().lock(), "{line}")?,
            Target::Stderr => writeln!(std::io::stderr().lock(), "{line}")?,
            Target::File(path, file) => {
                let Ok(mut file) = file.lock() else {
                    return Err(Error::Io(std::io::Error::other(format!(
                        "failed to acquire lock on {}",
                        path.display()
                    ))));
                };
                writeln!(file, "{line}")?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let target = match &self.target {
            Target::Stdout => "stdout".to_string(),
            Target::Stderr => "stderr".to_string(),
            Target::File(path, _) => path.display().to_string(),
        };
        format!("stream({target}) >= {}", self.level)
    }
}

/// Writes colored records to the terminal.
pub struct ConsoleHandler {
    terminal: Term,
    level: Level,
}

impl ConsoleHandler {
    pub fn new(args: LevelArgs) -> ConsoleHandler {
        ConsoleHandler {
            terminal: Term::stderr(),
            level: args.level,
        }
    }
}

impl Handler for ConsoleHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let level = match record.level {
            Level::Critical | Level::Error => style(record.level.as_str_upper()).red().bold(),
            Level::Warning => style(record.level.as_str_upper()).yellow().bold(),
            _ => style(record.level.as_str_upper()).dim(),
        };
        self.terminal
            .write_line(&format!("{level} [{}] {}", record.channel, record.message))?;
        for (label, value) in &record.context {
            self.terminal
                .write_line(&format!("{}", style(format!("  {label}: {value}")).dim()))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("console >= {}", self.level)
    }
}

/// Forwards records as `tracing` events.
pub struct TracingHandler {
    level: Level,
}

impl TracingHandler {
    pub fn new(args: LevelArgs) -> TracingHandler {
        TracingHandler { level: args.level }
    }
}

impl Handler for TracingHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let channel = record.channel.as_str();
        let context = serde_json::to_string(&record.context)?;
        let message = record.message.as_str();
        match record.level {
            Level::Critical | Level::Error => error!(channel, context, "{message}"),
            Level::Warning => warn!(channel, context, "{message}"),
            Level::Notice | Level::Info => info!(channel, context, "{message}"),
            Level::Debug => debug!(channel, context, "{message}"),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tracing >= {}", self.level)
    }
}

/// Accepts every record and drops it.
pub struct NullHandler;

impl Handler for NullHandler {
    fn level(&self) -> Level {
        Level::Debug
    }

    fn handle(&self, _record: &Record) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "null".to_string()
    }
}

/// Keeps records in memory.
#[derive(Default)]
pub struct TestHandler {
    records: Mutex<Vec<Record>>,
    level: Level,
}

impl TestHandler {
    pub fn new(args: LevelArgs) -> TestHandler {
        TestHandler {
            records: Mutex::new(Vec::new()),
            level: args.level,
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Whether a record with `level` whose message contains `needle` was handled.
    pub fn has_record(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.level == level && record.message.contains(needle))
    }
}

impl Handler for TestHandler {
    fn level(&self) -> Level {
        self.level
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let Ok(mut records) = self.records.lock() else {
            return Err(Error::Io(std::io::Error::other(
                "failed to acquire test handler lock",
            )));
        };
        records.push(record.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("test >= {}", self.level)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn args(s: &str) -> TomlValue {
        TomlValue::Table(toml::from_str(s).unwrap())
    }

    #[test_case("stream", "stream(stderr) >= debug"; "short name")]
    #[test_case("StreamHandler", "stream(stderr) >= debug"; "class name")]
    #[test_case("console", "console >= debug"; "console")]
    #[test_case("TracingHandler", "tracing >= debug"; "tracing")]
    #[test_case("null", "null"; "null")]
    fn resolve_handler(kind: &str, description: &str) -> eyre::Result<()> {
        let handler = resolve(kind, &TomlValue::Table(Default::default()))?;
        assert_eq!(handler.describe(), description);
        Ok(())
    }

    #[test]
    fn resolve_with_args() -> eyre::Result<()> {
        let handler = resolve("stream", &args("path = \"stdout\"\nlevel = \"warning\""))?;
        assert_eq!(handler.describe(), "stream(stdout) >= warning");
        assert!(handler.handles(Level::Error));
        assert!(!handler.handles(Level::Info));
        Ok(())
    }

    #[test]
    fn resolve_unknown() {
        let err = resolve("SlackHandler", &TomlValue::Table(Default::default()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownHandler(ref kind) if kind == "SlackHandler"));
    }

    #[test]
    fn resolve_invalid_args() {
        let err = resolve("stream", &args("level = \"loud\"")).err().unwrap();
        assert!(
            matches!(err, Error::InvalidHandlerArgs { ref handler, .. } if handler == "stream"),
            "{err}"
        );
    }

    #[test]
    fn stream_to_file() -> eyre::Result<()> {
        let path = std::env::temp_dir().join(format!("faillog-stream-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let handler = StreamHandler::new(StreamArgs {
            path: path.to_string_lossy().into_owned(),
            level: Level::Debug,
        })?;
        handler.handle(&Record::new("tests", Level::Error, "first"))?;
        handler.handle(&Record::new("tests", Level::Warning, "second"))?;

        let written = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("tests.ERROR: first []"), "{}", lines[0]);
        assert!(lines[1].ends_with("tests.WARNING: second []"), "{}", lines[1]);
        Ok(())
    }

    #[test]
    fn test_handler_keeps_records() -> eyre::Result<()> {
        let handler = TestHandler::default();
        handler.handle(&Record::new("tests", Level::Warning, "Test a failed"))?;
        assert!(handler.has_record(Level::Warning, "a failed"));
        assert!(!handler.has_record(Level::Error, "a failed"));
        assert_eq!(handler.records().len(), 1);
        Ok(())
    }
}
