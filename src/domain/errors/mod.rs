// Domain errors - Error types shared by every task unit

use thiserror::Error;

/// Domain-specific error types
///
/// The `Display` text of each variant is what ends up in a task's terminal
/// message, so it is written for people rather than for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("bad arguments: {0}")]
    BadArgs(String),
    /// The link does not carry a recognizable media identifier
    #[error("invalid media identifier: {0}")]
    InvalidIdentifier(String),
    /// Start is not before end, or the range runs past the source
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
    /// A track the operation needs is absent from the source
    #[error("{0}")]
    MissingTrack(String),
    /// Neither the audio nor the video probe could open the file
    #[error("unreadable media: {0}")]
    Unreadable(String),
    /// Metadata service failure (unknown id, empty track list, bad response)
    #[error("metadata lookup failed: {0}")]
    Metadata(String),
    /// Connection, status or short-body failure while streaming
    #[error("network error: {0}")]
    Network(String),
    /// Encoder failure, carrying the pipeline's own text
    #[error("{0}")]
    Media(String),
    /// Multiplexing fetched tracks failed; intermediates are kept on disk
    #[error("{0}")]
    MergeFailed(String),
    /// File system failure
    #[error("file system error: {0}")]
    FsFail(String),
    /// Configuration could not be loaded or validated
    #[error("configuration error: {0}")]
    Config(String),
    /// The task was stopped by a forced shutdown
    #[error("task aborted")]
    Aborted,
}

impl DomainError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        DomainError::FsFail(format!("{}: {}", context, err))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, DomainError::Aborted)
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
