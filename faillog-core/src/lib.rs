//! # faillog Core
//!
//! Core functionality of faillog: turning test failure notifications into log
//! messages and handing them to a handler stack.
//!
//! This crate provides:
//! - The notification data model (plain and scenario-driven tests)
//! - Failing-step resolution and message formatting
//! - The reporter event loop and the failure reporter
//! - The sink contract, a logger and its handlers
//! - Configuration management
//!
//! ## Architecture (block diagram)
//!
//! ```text
//! +---------------------+      +---------------------+      +---------------------+
//! | test host           | ---> | event channel       | ---> | FailureReporter     |
//! | failed/error/       |      | publish/subscribe   |      | on_failed/on_error/ |
//! | incomplete          |      |                     |      | on_incomplete       |
//! +---------------------+      +---------------------+      +---------------------+
//!                                                                      |
//!                                                                      v
//! +---------------------+      +---------------------+      +---------------------+
//! | faillog.toml        | ---> | Formatter           | <--- | Artifacts::locate   |
//! | message, report_url |      | template + failing  |      | (report files)      |
//! | handlers            |      | step + report links |      +---------------------+
//! +---------------------+      +---------------------+
//!            |                            |
//!            v                            v
//! +---------------------+      +---------------------+
//! | handler::resolve    | ---> | Logger (Sink)       | ---> stream/console/tracing
//! +---------------------+      +---------------------+
//! ```
//!
//! Most users should use the main `faillog` crate rather than importing `faillog-core` directly.

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod logger;
pub mod notification;
pub mod reporter;
pub mod sink;
pub mod template;

pub use eyre;

/// Type alias for human-readable test names.
pub type TestName = String;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{publish, subscribe, Event, EventKind};
pub use logger::Logger;
pub use notification::{
    Artifact, Artifacts, Notification, Outcome, Reports, Scenario, Step, TestFailure,
};
pub use reporter::{
    find_failing_step, FailureReporter, FormattedMessage, Formatter, NullReporter, Reporter,
};
pub use sink::{Context, Level, Record, Sink};
pub use template::Template;
