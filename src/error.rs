//! Error types for the media matcher.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media matcher.
#[derive(Error, Debug)]
pub enum Error {
    /// A running match was cancelled through its cancellation token.
    ///
    /// This is a hard stop: callers must not treat a cancelled match as a
    /// partial result or retry it internally.
    #[error("Matching was cancelled")]
    Cancelled,

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    // Candidate pool errors
    #[error("Invalid candidate file: {0}")]
    InvalidCandidateFile(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
