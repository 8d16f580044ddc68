//! Data describing one finished test that did not pass.
//!
//! A [`Notification`] is built once by the host when a test fails, errors
//! out, or is marked incomplete, and is read-only afterwards. Tests driven by
//! a scenario carry their recorded [`Step`]s so the reporter can tell which
//! action was being attempted when things went wrong.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::TestName;

/// Outcome classification of a finished test.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Failed,
    Error,
    Incomplete,
}

/// One action of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Humanized action without its arguments, e.g. `click button`.
    pub action: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    /// `true` once the step completed without error.
    #[serde(default)]
    pub executed: bool,
}

impl Step {
    pub fn new(action: impl Into<String>, executed: bool) -> Step {
        Step {
            action: action.into(),
            arguments: Vec::new(),
            executed,
        }
    }

    pub fn with_arguments<I, A>(mut self, arguments: I) -> Step
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn humanized_action_without_arguments(&self) -> &str {
        &self.action
    }

    /// Humanized action followed by its quoted arguments, e.g.
    /// `fill field "#user", "admin"`.
    pub fn humanized_action(&self) -> String {
        if self.arguments.is_empty() {
            return self.action.clone();
        }
        format!(
            "{} {}",
            self.action,
            self.arguments.iter().map(|arg| format!("\"{arg}\"")).join(", ")
        )
    }
}

/// Feature under test and the ordered steps recorded while running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub feature: String,
    #[serde(default)]
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(feature: impl Into<String>, steps: Vec<Step>) -> Scenario {
        Scenario {
            feature: feature.into(),
            steps,
        }
    }

    /// Steps in the order they were recorded.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Paths of report artifacts generated for a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reports {
    #[serde(default)]
    pub html: Option<PathBuf>,
    #[serde(default)]
    pub png: Option<PathBuf>,
}

/// Everything known about a test that did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    /// Identifier of the test, e.g. `LoginCest:testLogin`.
    pub id: String,
    /// Human-readable name.
    pub name: TestName,
    pub outcome: Outcome,
    /// Message of the error that ended the test.
    pub message: String,
    #[serde(default)]
    pub trace: String,
    #[serde(default)]
    pub reports: Reports,
}

impl TestFailure {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
        trace: impl Into<String>,
    ) -> TestFailure {
        TestFailure {
            id: id.into(),
            name: name.into(),
            outcome,
            message: message.into(),
            trace: trace.into(),
            reports: Reports::default(),
        }
    }

    pub fn with_reports(mut self, reports: Reports) -> TestFailure {
        self.reports = reports;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    Plain(TestFailure),
    Scenario {
        #[serde(flatten)]
        failure: TestFailure,
        scenario: Scenario,
    },
}

impl Notification {
    pub fn failure(&self) -> &TestFailure {
        match self {
            Notification::Plain(failure) => failure,
            Notification::Scenario { failure, .. } => failure,
        }
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        match self {
            Notification::Plain(_) => None,
            Notification::Scenario { scenario, .. } => Some(scenario),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.failure().outcome
    }
}

/// A report artifact with its availability already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub exists: bool,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, exists: bool) -> Artifact {
        Artifact {
            path: path.into(),
            exists,
        }
    }

    /// Check on the filesystem whether the artifact is there.
    pub fn locate(path: &Path) -> Artifact {
        Artifact::new(path, path.exists())
    }

    /// File name of the artifact, empty when it doesn't exist.
    pub fn base_name(&self) -> String {
        if !self.exists {
            return String::new();
        }
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Resolved report artifacts handed to the formatter, so formatting itself
/// never touches the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub html: Option<Artifact>,
    pub png: Option<Artifact>,
}

impl Artifacts {
    pub fn new(html: Option<Artifact>, png: Option<Artifact>) -> Artifacts {
        Artifacts { html, png }
    }

    pub fn locate(reports: &Reports) -> Artifacts {
        Artifacts {
            html: reports.html.as_deref().map(Artifact::locate),
            png: reports.png.as_deref().map(Artifact::locate),
        }
    }

    pub fn html_base_name(&self) -> String {
        self.html.as_ref().map(Artifact::base_name).unwrap_or_default()
    }

    pub fn png_base_name(&self) -> String {
        self.png.as_ref().map(Artifact::base_name).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(&[], "click button"; "no arguments")]
    #[test_case(&["#submit"], "click button \"#submit\""; "one argument")]
    #[test_case(&["#user", "admin"], "click button \"#user\", \"admin\""; "two arguments")]
    fn humanized_action(arguments: &[&str], expected: &str) {
        let step = Step::new("click button", true).with_arguments(arguments.iter().copied());
        assert_eq!(step.humanized_action(), expected);
        assert_eq!(step.humanized_action_without_arguments(), "click button");
    }

    #[test]
    fn artifact_base_name() {
        assert_eq!(Artifact::new("/tmp/report.html", true).base_name(), "report.html");
        assert_eq!(Artifact::new("/tmp/shot.png", false).base_name(), "");
    }

    #[test]
    fn locate_artifacts() {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let reports = Reports {
            html: Some(manifest.clone()),
            png: Some(PathBuf::from("/nonexistent/faillog/shot.png")),
        };

        let artifacts = Artifacts::locate(&reports);
        assert_eq!(artifacts.html, Some(Artifact::new(manifest, true)));
        assert_eq!(artifacts.html_base_name(), "Cargo.toml");
        assert_eq!(artifacts.png_base_name(), "");
        assert_eq!(Artifacts::locate(&Reports::default()), Artifacts::default());
    }

    #[test]
    fn deserialize_scenario_notification() -> eyre::Result<()> {
        let json = r##"{
            "type": "scenario",
            "id": "LoginCest:testLogin",
            "name": "testLogin",
            "outcome": "failed",
            "message": "element not found",
            "trace": "#0 LoginCest.php:12",
            "scenario": {
                "feature": "login",
                "steps": [
                    {"action": "am on page", "arguments": ["/login"], "executed": true},
                    {"action": "click button", "executed": false}
                ]
            }
        }"##;

        let notification: Notification = serde_json::from_str(json)?;
        assert_eq!(notification.outcome(), Outcome::Failed);
        assert_eq!(notification.failure().id, "LoginCest:testLogin");
        assert_eq!(notification.failure().reports, Reports::default());

        let scenario = notification.scenario().expect("scenario");
        assert_eq!(scenario.feature, "login");
        assert_eq!(
            scenario.steps(),
            &[
                Step::new("am on page", true).with_arguments(["/login"]),
                Step::new("click button", false),
            ]
        );
        Ok(())
    }

    #[test]
    fn deserialize_plain_notification() -> eyre::Result<()> {
        let json = r#"{"type": "plain", "id": "a", "name": "a", "outcome": "incomplete", "message": "todo"}"#;
        let notification: Notification = serde_json::from_str(json)?;
        assert_eq!(notification.outcome(), Outcome::Incomplete);
        assert!(notification.scenario().is_none());
        assert_eq!(notification.failure().trace, "");
        Ok(())
    }
}
