//! Common error types used throughout tunesmith.
//!
//! Errors fall in two groups. Caller errors (unsupported format, invalid
//! transition, incomplete archive, rejected input) are returned synchronously
//! from the operation that was misused. Runtime failures (engine
//! initialization, transcoding, tool execution) are captured per record and
//! never cross record boundaries.

use std::fmt;

/// Common error type for tunesmith.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown format token or container identifier.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An operation was attempted on a record whose status forbids it.
    #[error("Invalid transition for record {id}: cannot {action} while {status}")]
    InvalidTransition {
        /// The record the operation targeted.
        id: String,
        /// The record's status at the time of the attempt.
        status: String,
        /// The attempted operation.
        action: String,
    },

    /// The shared transcoding engine failed to initialize.
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// The engine rejected or errored on one conversion.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// An archive was requested while some records are not done.
    #[error("Archive incomplete: {pending} of {total} records are not done")]
    IncompleteArchive {
        /// Records that are not in the done state.
        pending: usize,
        /// Total records in the queue.
        total: usize,
    },

    /// One or more files of a batch are not accepted; nothing was ingested.
    #[error("Unsupported input files: {}", .files.join(", "))]
    RejectedInput {
        /// Names of the offending files.
        files: Vec<String>,
    },

    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "record").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An external tool returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Writing the archive failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error reports misuse by the caller rather than a runtime
    /// failure of the engine or the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::InvalidTransition { .. }
                | Error::IncompleteArchive { .. }
                | Error::RejectedInput { .. }
                | Error::NotFound { .. }
        )
    }

    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(value: S) -> Self {
        Self::UnsupportedFormat(value.into())
    }

    /// Create a new InvalidTransition error.
    pub fn invalid_transition(
        id: impl fmt::Display,
        status: impl fmt::Display,
        action: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            id: id.to_string(),
            status: status.to_string(),
            action: action.into(),
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Transcode error.
    pub fn transcode<S: Into<String>>(reason: S) -> Self {
        Self::Transcode(reason.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unsupported_format("opus");
        assert_eq!(err.to_string(), "Unsupported format: opus");

        let err = Error::invalid_transition("abc", "converting", "remove");
        assert_eq!(
            err.to_string(),
            "Invalid transition for record abc: cannot remove while converting"
        );

        let err = Error::IncompleteArchive {
            pending: 1,
            total: 3,
        };
        assert_eq!(err.to_string(), "Archive incomplete: 1 of 3 records are not done");

        let err = Error::RejectedInput {
            files: vec!["a.txt".into(), "b.pdf".into()],
        };
        assert_eq!(err.to_string(), "Unsupported input files: a.txt, b.pdf");

        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_caller_errors() {
        assert!(Error::unsupported_format("x").is_caller_error());
        assert!(Error::invalid_transition("id", "done", "start").is_caller_error());
        assert!(Error::IncompleteArchive { pending: 1, total: 1 }.is_caller_error());
        assert!(Error::not_found("record", "id").is_caller_error());

        assert!(!Error::EngineInit("missing".into()).is_caller_error());
        assert!(!Error::transcode("bad stream").is_caller_error());
        assert!(!Error::tool("ffmpeg", "crash").is_caller_error());
    }
}
