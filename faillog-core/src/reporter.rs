use eyre::WrapErr;
use tokio::sync::broadcast;
use tracing::*;
use url::Url;

use crate::{
    event::{self, Event, EventKind},
    notification::{Artifacts, Notification, Step},
    sink::{Context, Level, Sink},
    template::Template,
    Config, Error, Result,
};

/// Context label under which report links are attached.
pub const REPORT_CONTEXT_KEY: &str = "Report   HTML   Screenshot";

/// Reporter trait. The trait is based on the "template method" pattern.
/// You can implement on_xxx methods to hook into failure events. This way is enough for most usecases.
/// If you need more control, you can override the "run" method.
#[async_trait::async_trait]
pub trait Reporter {
    async fn run(&mut self) -> eyre::Result<()> {
        let rx = event::subscribe()?;
        self.run_with(rx).await
    }

    /// Dispatch events from `rx` until its channel is closed.
    ///
    /// Events dropped because the receiver lagged behind are not reported, so
    /// the loop fails once the channel is drained.
    async fn run_with(&mut self, mut rx: broadcast::Receiver<Event>) -> eyre::Result<()> {
        let mut lost = 0u64;
        loop {
            match rx.recv().await {
                Ok(Event { kind, notification }) => match kind {
                    EventKind::Failed => self.on_failed(notification).await?,
                    EventKind::Error => self.on_error(notification).await?,
                    EventKind::Incomplete => self.on_incomplete(notification).await?,
                },
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event channel has been closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event channel lagged, {skipped} failure events lost");
                    lost += skipped;
                    continue;
                }
            }
        }

        if lost > 0 {
            eyre::bail!("{lost} failure event(s) were lost because the reporter lagged behind");
        }
        Ok(())
    }

    /// Called when a test fails.
    async fn on_failed(&mut self, _notification: Notification) -> eyre::Result<()> {
        Ok(())
    }

    /// Called when a test ends with an error.
    async fn on_error(&mut self, _notification: Notification) -> eyre::Result<()> {
        Ok(())
    }

    /// Called when a test is marked incomplete.
    async fn on_incomplete(&mut self, _notification: Notification) -> eyre::Result<()> {
        Ok(())
    }
}

pub struct NullReporter;

#[async_trait::async_trait]
impl Reporter for NullReporter {}

/// Find the step a scenario failed at: the first step that was not executed,
/// or the last step when every step was executed (e.g. an assertion failing
/// after the last recorded step).
pub fn find_failing_step(steps: &[Step]) -> Result<&Step> {
    steps
        .iter()
        .find(|step| !step.executed)
        .or_else(|| steps.last())
        .ok_or(Error::EmptyScenario)
}

/// The message and context handed to a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedMessage {
    pub message: String,
    pub context: Context,
}

/// Turns notifications into log messages.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    template: Template,
    report_url: Option<Url>,
    step_arguments: bool,
}

impl Formatter {
    pub fn new(template: Template) -> Formatter {
        Formatter {
            template,
            report_url: None,
            step_arguments: false,
        }
    }

    pub fn from_config(cfg: &Config) -> Formatter {
        Formatter {
            template: cfg.message.clone(),
            report_url: cfg.report_url.clone(),
            step_arguments: cfg.step_arguments,
        }
    }

    /// Attach report links under this base URL.
    pub fn with_report_url(mut self, report_url: Url) -> Formatter {
        self.report_url = Some(report_url);
        self
    }

    /// Describe the failing step together with its arguments.
    pub fn with_step_arguments(mut self, step_arguments: bool) -> Formatter {
        self.step_arguments = step_arguments;
        self
    }

    /// Derive the failure description: the raw error message, or for
    /// scenario-driven tests what was being attempted when it failed.
    pub fn failure_message(&self, notification: &Notification) -> Result<String> {
        let failure = notification.failure();
        let Some(scenario) = notification.scenario() else {
            return Ok(failure.message.clone());
        };

        let step = find_failing_step(scenario.steps())?;
        let action = if self.step_arguments {
            step.humanized_action()
        } else {
            step.humanized_action_without_arguments().to_string()
        };
        Ok(format!(
            "Tried to {} but failed when I wanted to {action} ({})",
            scenario.feature, failure.message
        ))
    }

    /// Report links keyed by [`REPORT_CONTEXT_KEY`]. Empty unless a report URL
    /// is configured; missing artifacts leave an empty file name in their link.
    pub fn context(&self, artifacts: &Artifacts) -> Context {
        let mut context = Context::new();
        let Some(report_url) = &self.report_url else {
            return context;
        };

        let base = report_url.as_str().trim_end_matches('/');
        context.insert(
            REPORT_CONTEXT_KEY.to_string(),
            format!(
                "<{base}/report.html|  Link><{base}/{}|   Link><{base}/{}|      Link>",
                artifacts.html_base_name(),
                artifacts.png_base_name(),
            ),
        );
        context
    }

    pub fn format(
        &self,
        notification: &Notification,
        artifacts: &Artifacts,
    ) -> Result<FormattedMessage> {
        let failure = notification.failure();
        let message = self.failure_message(notification)?;
        Ok(FormattedMessage {
            message: self.template.render(&failure.name, &message, &failure.trace),
            context: self.context(artifacts),
        })
    }
}

/// Logs every failure event to a sink: failures and errors at `error`,
/// incomplete tests at `warning`.
pub struct FailureReporter<S> {
    formatter: Formatter,
    sink: S,
    reported: usize,
}

impl<S: Sink> FailureReporter<S> {
    pub fn new(formatter: Formatter, sink: S) -> FailureReporter<S> {
        FailureReporter {
            formatter,
            sink,
            reported: 0,
        }
    }

    pub fn from_config(cfg: &Config, sink: S) -> FailureReporter<S> {
        FailureReporter::new(Formatter::from_config(cfg), sink)
    }

    /// Number of notifications logged so far.
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Log a notification at the level of its outcome.
    pub fn report(&mut self, notification: &Notification) -> eyre::Result<()> {
        let kind = EventKind::from(notification.outcome());
        self.log(kind.level(), notification)
    }

    fn log(&mut self, level: Level, notification: &Notification) -> eyre::Result<()> {
        let test = &notification.failure().id;
        let artifacts = Artifacts::locate(&notification.failure().reports);
        let FormattedMessage { message, context } = self
            .formatter
            .format(notification, &artifacts)
            .wrap_err_with(|| format!("failed to format failure of test \"{test}\""))?;

        debug!("reporting test \"{test}\" at {level}");
        self.sink
            .log(level, &message, &context)
            .wrap_err_with(|| format!("failed to log failure of test \"{test}\""))?;
        self.reported += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Sink + Send> Reporter for FailureReporter<S> {
    async fn on_failed(&mut self, notification: Notification) -> eyre::Result<()> {
        self.log(EventKind::Failed.level(), &notification)
    }

    async fn on_error(&mut self, notification: Notification) -> eyre::Result<()> {
        self.log(EventKind::Error.level(), &notification)
    }

    async fn on_incomplete(&mut self, notification: Notification) -> eyre::Result<()> {
        self.log(EventKind::Incomplete.level(), &notification)
    }
}
