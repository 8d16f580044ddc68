use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use console::{style, Term};
use eyre::WrapErr;
use faillog_core::{
    event, Artifacts, Config, FailureReporter, Formatter, Logger, Notification, Reporter,
};
use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::*;

/// Build the CLI with clap's builder pattern
fn build_cli() -> ClapCommand {
    let config = Arg::new("config")
        .long("config")
        .help("Path to faillog.toml. Defaults to $FAILLOG_CONFIG or ./faillog.toml")
        .value_parser(clap::value_parser!(PathBuf));
    ClapCommand::new("faillog")
        .about("faillog CLI forwards recorded test failures to the configured log handlers")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .subcommand(
            ClapCommand::new("report")
                .about("Log failure notifications (JSON lines) through the configured handlers")
                .arg(Arg::new("input")
                    .short('i')
                    .long("input")
                    .help("File with one JSON notification per line. Reads stdin when omitted")
                    .value_parser(clap::value_parser!(PathBuf)))
                .arg(Arg::new("capture-rust")
                    .long("capture-rust")
                    .help("Print faillog's internal \"tracing\" logs to stderr, filtered by RUST_LOG")
                    .action(ArgAction::SetTrue))
                .arg(config.clone())
        )
        .subcommand(
            ClapCommand::new("check")
                .about("Format failure notifications and print them without logging")
                .arg(Arg::new("input")
                    .help("File with one JSON notification per line")
                    .required(true)
                    .value_parser(clap::value_parser!(PathBuf)))
                .arg(config.clone())
        )
        .subcommand(
            ClapCommand::new("handlers")
                .about("List the configured handler chain")
                .arg(config)
        )
}

/// faillog CLI.
pub struct App {
    term: Term,
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

impl App {
    pub fn new() -> App {
        App {
            term: Term::stdout(),
        }
    }

    /// Parse command-line args and run faillog CLI sub command.
    pub async fn run(self) -> eyre::Result<()> {
        let matches = build_cli().get_matches();
        self.dispatch(matches).await
    }

    /// Same as [`App::run`] with explicit args, the first being the binary name.
    pub async fn run_from<I, T>(self, args: I) -> eyre::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_cli().try_get_matches_from(args)?;
        self.dispatch(matches).await
    }

    async fn dispatch(self, matches: ArgMatches) -> eyre::Result<()> {
        let term = self.term;

        match matches.subcommand() {
            Some(("report", report_matches)) => {
                if report_matches.get_flag("capture-rust") {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                        .with_writer(std::io::stderr)
                        .try_init();
                }
                let cfg = load_config(report_matches)?;
                let notifications = match report_matches.get_one::<PathBuf>("input") {
                    Some(path) => read_notifications_from(path)?,
                    None => read_notifications(std::io::stdin().lock())?,
                };

                let logger = Logger::from_config(&cfg)?;
                let handlers = logger.handlers().len();
                let reported = report(&cfg, logger, notifications).await?;
                term.write_line(&summary(reported, handlers))?;
                Ok(())
            }
            Some(("check", check_matches)) => {
                let cfg = load_config(check_matches)?;
                let path = check_matches
                    .get_one::<PathBuf>("input")
                    .ok_or_else(|| eyre::eyre!("input is required"))?;
                let formatter = Formatter::from_config(&cfg);

                for notification in read_notifications_from(path)? {
                    let artifacts = Artifacts::locate(&notification.failure().reports);
                    let test = &notification.failure().id;
                    let formatted = formatter
                        .format(&notification, &artifacts)
                        .wrap_err_with(|| format!("failed to format test \"{test}\""))?;
                    let level = event::EventKind::from(notification.outcome()).level();
                    term.write_line(&format!(
                        "{} {}",
                        style(level.as_str_upper()).bold(),
                        formatted.message
                    ))?;
                    for (label, value) in &formatted.context {
                        let line = style(format!("  {label}: {value}")).dim();
                        term.write_line(&format!("{line}"))?;
                    }
                }
                Ok(())
            }
            Some(("handlers", handlers_matches)) => {
                let cfg = load_config(handlers_matches)?;
                let logger = Logger::from_config(&cfg)?;
                term.write_line(&format!("* {}", logger.channel()))?;
                if logger.handlers().is_empty() {
                    term.write_line("  (no handlers, records are dropped)")?;
                }
                for handler in logger.handlers() {
                    term.write_line(&format!("  - {}", handler.describe()))?;
                }
                Ok(())
            }
            _ => unreachable!("Subcommand required is set to true"),
        }
    }
}

fn load_config(matches: &ArgMatches) -> eyre::Result<Config> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load_from(path)
            .wrap_err_with(|| format!("failed to load {}", path.display())),
        None => Ok(Config::load()?),
    }
}

/// Last line printed by `report`. Failures handed to an empty handler chain
/// never reach a log, so they are counted as dropped.
fn summary(reported: usize, handlers: usize) -> String {
    if reported == 0 {
        format!("{} 0 failure(s) reported", style("✓").green())
    } else if handlers == 0 {
        warn!("{reported} failure(s) dropped: no handlers configured");
        format!(
            "{} {reported} failure(s) dropped: no handlers configured",
            style("!").yellow()
        )
    } else {
        format!("{} {reported} failure(s) reported", style("✘").red())
    }
}

/// Publish notifications on the event channel and log them with a
/// [`FailureReporter`]. Returns how many were reported.
async fn report(
    cfg: &Config,
    logger: Logger,
    notifications: Vec<Notification>,
) -> eyre::Result<usize> {
    let mut reporter = FailureReporter::from_config(cfg, logger);
    let rx = event::subscribe()?;

    let publisher = async move {
        for notification in notifications {
            event::publish(notification)?;
            tokio::task::yield_now().await;
        }
        debug!("all notifications published. closing the event channel.");
        event::close()
    };

    let (published, reported) = tokio::join!(publisher, reporter.run_with(rx));
    reported?;
    published?;
    Ok(reporter.reported())
}

fn read_notifications_from(path: &Path) -> eyre::Result<Vec<Notification>> {
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    read_notifications(file)
}

/// Parse one JSON notification per line, skipping blank lines.
fn read_notifications(reader: impl Read) -> eyre::Result<Vec<Notification>> {
    BufReader::new(reader)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str::<Notification>(&line)
                    .wrap_err_with(|| format!("invalid notification at line {}", i + 1)),
            ),
            Err(e) => Some(Err::<Notification, _>(e).wrap_err("failed to read notifications")),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use faillog_core::Outcome;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(&["faillog", "report"]; "report from stdin")]
    #[test_case(&["faillog", "report", "-i", "failures.jsonl", "--capture-rust"]; "report from file")]
    #[test_case(&["faillog", "check", "failures.jsonl", "--config", "faillog.toml"]; "check")]
    #[test_case(&["faillog", "handlers"]; "handlers")]
    fn parse_args(args: &[&str]) {
        assert!(build_cli().try_get_matches_from(args).is_ok());
    }

    #[test_case(&["faillog"]; "subcommand required")]
    #[test_case(&["faillog", "check"]; "check needs input")]
    fn reject_args(args: &[&str]) {
        assert!(build_cli().try_get_matches_from(args).is_err());
    }

    #[test_case(0, 0, "✓ 0 failure(s) reported"; "nothing to report")]
    #[test_case(0, 2, "✓ 0 failure(s) reported"; "nothing to report with handlers")]
    #[test_case(3, 1, "✘ 3 failure(s) reported"; "reported")]
    #[test_case(3, 0, "! 3 failure(s) dropped: no handlers configured"; "no handlers")]
    fn report_summary(reported: usize, handlers: usize, expected: &str) {
        let line = summary(reported, handlers);
        assert_eq!(console::strip_ansi_codes(&line), expected);
    }

    #[tokio::test]
    async fn missing_config_is_error() {
        let result = App::new()
            .run_from(["faillog", "handlers", "--config", "/nonexistent/typo.toml"])
            .await;
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("/nonexistent/typo.toml"), "{err}");
    }

    #[test]
    fn read_json_lines() -> eyre::Result<()> {
        let input = r#"
{"type": "plain", "id": "a", "name": "a", "outcome": "failed", "message": "boom"}

{"type": "scenario", "id": "b", "name": "b", "outcome": "incomplete", "message": "todo", "scenario": {"feature": "log in", "steps": []}}
"#;
        let notifications = read_notifications(input.as_bytes())?;
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].outcome(), Outcome::Failed);
        assert_eq!(notifications[1].scenario().map(|s| s.feature.as_str()), Some("log in"));
        Ok(())
    }

    #[test]
    fn invalid_line_is_reported() {
        let input = "{\"type\": \"plain\"}\n";
        let err = read_notifications(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }
}
