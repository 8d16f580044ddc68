//! # faillog - forward test failures to a log handler stack
//!
//! faillog listens for the failure events of a test host (a test failed,
//! errored out or was marked incomplete), turns each one into a readable
//! message and logs it through a configurable stack of handlers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use faillog::{event, Config, FailureReporter, Logger, Notification, Outcome, Reporter, TestFailure};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let cfg = Config::load()?;
//!     let mut reporter = FailureReporter::from_config(&cfg, Logger::from_config(&cfg)?);
//!     let rx = event::subscribe()?;
//!
//!     event::publish(Notification::Plain(TestFailure::new(
//!         "LoginCest:testLogin",
//!         "LoginCest:testLogin",
//!         Outcome::Failed,
//!         "element not found",
//!         "#0 LoginCest.php(12)",
//!     )))?;
//!     event::close()?;
//!
//!     reporter.run_with(rx).await
//! }
//! ```
//!
//! ## Scenario-driven tests
//!
//! When a notification carries a scenario, the message says what the test was
//! trying to do and which step it failed at:
//!
//! ```text
//! Tried to login but failed when I wanted to click button (element not found)
//! ```
//!
//! The failing step is the first step that was not executed, or the last step
//! when all of them ran.
//!
//! ## Report links
//!
//! With `report_url` configured, every message carries a context entry
//! linking the HTML report and the screenshot under that URL.

mod app;

pub use eyre;

pub use app::App;

pub use faillog_core::{
    config::Config,
    event::{self, Event, EventKind},
    find_failing_step,
    handler::{self, Handler},
    Artifact, Artifacts, Context, Error, FailureReporter, FormattedMessage, Formatter, Level,
    Logger, Notification, NullReporter, Outcome, Record, Reporter, Reports, Result, Scenario,
    Sink, Step, Template, TestFailure,
};
