pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Occurs when `faillog.toml` fails to load.
    #[error("failed to load faillog.toml: {0}")]
    LoadError(String),
    /// Occurs when a message template does not have exactly three `%s` slots.
    #[error("message template {template:?} must have 3 \"%s\" slots (name, message, trace), found {slots}")]
    InvalidTemplate { template: String, slots: usize },
    /// Occurs when `report_url` is not a valid URL.
    #[error("invalid report_url: {0}")]
    InvalidReportUrl(#[from] url::ParseError),
    /// Occurs when a configured handler type is not known.
    #[error("unknown log handler \"{0}\"")]
    UnknownHandler(String),
    /// Occurs when the arguments of a configured handler can't be deserialized.
    #[error("invalid arguments for log handler \"{handler}\": {source}")]
    InvalidHandlerArgs {
        handler: String,
        #[source]
        source: toml::de::Error,
    },
    /// Occurs when a failing step is looked up in a scenario without steps.
    #[error("scenario has no steps to report")]
    EmptyScenario,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to serialize log context: {0}")]
    Serialize(#[from] serde_json::Error),
}
