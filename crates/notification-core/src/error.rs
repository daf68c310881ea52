//! Error types for the notification consumers.

use thiserror::Error;

/// Result type alias using NotifyError.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Primary error type for notification handling.
#[derive(Debug, Error)]
pub enum NotifyError {
    // === Payload Errors ===
    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    // === Remote Errors ===
    #[error("Subscription confirmation returned {status}")]
    Confirmation { status: u16 },

    #[error("Download of {url} returned {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Queue error: {0}")]
    Queue(String),

    // === Local Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// What the poll loop does with a message whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Log and delete the message; it can never be processed.
    Discard,
    /// Log and leave the message on the queue for redelivery.
    Retain,
    /// Stop polling.
    Halt,
}

impl NotifyError {
    /// Build a parse error for the named payload layer.
    pub fn parse(context: &str, err: impl std::fmt::Display) -> Self {
        NotifyError::Parse {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    /// Short stable label used in log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyError::Parse { .. } => "parse",
            NotifyError::MissingField(_) => "missing_field",
            NotifyError::InvalidField { .. } => "invalid_field",
            NotifyError::Confirmation { .. } => "confirmation",
            NotifyError::FetchStatus { .. } => "fetch_status",
            NotifyError::Transport(_) => "transport",
            NotifyError::Queue(_) => "queue",
            NotifyError::Io(_) => "io",
            NotifyError::Config(_) => "config",
        }
    }

    /// Poll-loop policy for this error.
    pub fn poll_action(&self) -> PollAction {
        match self {
            NotifyError::Parse { .. }
            | NotifyError::MissingField(_)
            | NotifyError::InvalidField { .. } => PollAction::Discard,

            NotifyError::Confirmation { .. }
            | NotifyError::FetchStatus { .. }
            | NotifyError::Transport(_)
            | NotifyError::Queue(_) => PollAction::Retain,

            NotifyError::Io(_) | NotifyError::Config(_) => PollAction::Halt,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for NotifyError {
    fn from(err: std::io::Error) -> Self {
        NotifyError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::Transport(format!("request timed out: {}", err))
        } else {
            NotifyError::Transport(err.to_string())
        }
    }
}
