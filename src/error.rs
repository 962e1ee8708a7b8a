//! Error types for media-dl
//!
//! This module provides error handling for the library:
//! - The crate-wide [`Error`] returned by fallible operations and collaborators
//! - [`ErrorKind`], the per-task failure classification carried by
//!   [`ErrorRecord`](crate::types::ErrorRecord)
//! - Stage-aware classification so a failure is attributed to the step that caused it

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Collaborators ([`Resolver`](crate::source::Resolver),
/// [`Streamer`](crate::source::Streamer), [`Transcoder`](crate::transcode::Transcoder),
/// [`Storage`](crate::storage::Storage)) return this type; the task runner turns it
/// into an [`ErrorRecord`](crate::types::ErrorRecord) for delivery to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "queue_parallelism")
        key: Option<String>,
    },

    /// Resource metadata could not be resolved
    #[error("resolve error: {0}")]
    Resolve(String),

    /// The byte stream could not be opened or broke mid-transfer
    #[error("stream error: {0}")]
    Stream(String),

    /// The transcoder rejected the input or exited unsuccessfully
    #[error("transcode error: {0}")]
    Transcode(String),

    /// Writing the output file failed
    #[error("write error: {0}")]
    Write(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (ffmpeg could not be spawned, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Task not found in the queue
    #[error("task not found: {0}")]
    NotFound(String),

    /// Task was cancelled before it reached a terminal state
    #[error("task cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Classification of a task failure
///
/// Every [`ErrorRecord`](crate::types::ErrorRecord) carries exactly one kind. The kind
/// names the stage that failed, except that a broken input stream is always
/// [`ErrorKind::StreamFailed`] and a cancellation is always [`ErrorKind::Cancelled`],
/// whichever stage noticed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Metadata lookup failed
    ResolveFailed,
    /// Opening or reading the byte stream failed
    StreamFailed,
    /// The transcoder failed
    TranscodeFailed,
    /// Writing the output file failed
    WriteFailed,
    /// The task was cancelled
    Cancelled,
}

impl ErrorKind {
    /// Machine-readable code for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ResolveFailed => "resolve_failed",
            ErrorKind::StreamFailed => "stream_failed",
            ErrorKind::TranscodeFailed => "transcode_failed",
            ErrorKind::WriteFailed => "write_failed",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error for a task that failed while in a stage whose
    /// default failure kind is `stage_kind`.
    pub fn classify(&self, stage_kind: ErrorKind) -> ErrorKind {
        match self {
            Error::Stream(_) => ErrorKind::StreamFailed,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Resolve(_) => ErrorKind::ResolveFailed,
            Error::Transcode(_) => ErrorKind::TranscodeFailed,
            Error::Write(_) => ErrorKind::WriteFailed,
            _ => stage_kind,
        }
    }
}
