//! Error types for stalkline
//!
//! Provides a unified error type for all client operations.

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using StalkError
pub type Result<T> = std::result::Result<T, StalkError>;

/// Unified error type for stalkline operations
#[derive(Debug, Error)]
pub enum StalkError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Any failure of the underlying byte stream: connect refused or timed
    /// out, reset, broken pipe, EOF in the middle of a frame, use after close.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    /// The server answered with one of its generic fault codes
    /// (OUT_OF_MEMORY, INTERNAL_ERROR, BAD_FORMAT, UNKNOWN_COMMAND).
    #[error("server fault: {0}")]
    ServerFault(Status),

    /// The status is in the command's declared error set.
    #[error("{command} failed: {status}")]
    CommandFailed {
        command: &'static str,
        status: Status,
    },

    /// The status is in neither the ok set nor the error set of the command.
    #[error("unexpected response to {command}: {status}")]
    UnexpectedResponse {
        command: &'static str,
        status: Status,
    },

    /// A reserve returned DEADLINE_SOON: a job reserved by this client is
    /// about to hit its TTR.
    #[error("deadline soon for a reserved job")]
    DeadlineSoon,

    // -------------------------------------------------------------------------
    // Local Errors
    // -------------------------------------------------------------------------
    /// A precondition failed before anything was written to the wire.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The response stream could not be framed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A stats or list body could not be decoded.
    #[error("document error: {0}")]
    Document(String),

    /// A text job body was not valid UTF-8.
    #[error("job body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl StalkError {
    /// The status carried by a server-side error, if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            StalkError::ServerFault(status)
            | StalkError::CommandFailed { status, .. }
            | StalkError::UnexpectedResponse { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Whether the underlying byte stream failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, StalkError::Transport(_))
    }

    /// Whether the stream position is no longer known after this error.
    ///
    /// A connection that sees one of these drops its stream; further
    /// commands fail until `reconnect`.
    pub fn breaks_stream(&self) -> bool {
        matches!(self, StalkError::Transport(_) | StalkError::Protocol(_))
    }
}
