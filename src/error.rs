use thiserror::Error;

/// Failures at the remote roster boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 409-class disagreement, e.g. the target filled up concurrently
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("HTTP {status}{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// The human-readable message the server supplied, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            StoreError::Conflict { message } => Some(message.as_str()),
            StoreError::NotFound(message) | StoreError::Invalid(message) => Some(message.as_str()),
            StoreError::Http { message, .. } => message.as_deref(),
            StoreError::Timeout | StoreError::Transport(_) | StoreError::Decode(_) => None,
        }
        .filter(|message| !message.trim().is_empty())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Misuse of the cascading school / period / grade selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Select a school first")]
    SchoolNotSelected,

    #[error("Select an academic period first")]
    PeriodNotSelected,

    #[error("Grade level '{0}' is not offered by the selected school")]
    UnknownGradeLevel(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
