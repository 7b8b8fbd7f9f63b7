//! Error types for message dispatch failures.
//!
//! Each variant maps to a specific failure mode in the read-dispatch-write
//! loop. Every failure short of end-of-stream is converted into a framed
//! `error` response; nothing propagates out of the loop uncaught.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::store::StoreError;
use crate::transport::FrameError;

/// Errors surfaced during message parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload was not valid JSON or not a JSON object.
    #[error("malformed message: {message}")]
    MalformedMessage {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// No handler is registered for the message's `type`.
    #[error("unknown message type: {message_type}")]
    UnknownMessageType { message_type: String },

    /// A required body field is missing or has the wrong shape.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// No run id was provided and the session has no current run.
    #[error("no active run: capture traffic first or provide a run_id")]
    NoActiveRun,

    /// The run has no stored capture.
    #[error("capture not found: {}; capture traffic first", path.display())]
    CaptureMissing { path: PathBuf },

    /// The run store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The agent engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Writing a frame to the output stream failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Serialising a response failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Whether the client may reasonably retry the request.
    ///
    /// Engine failures are transient (the agent may succeed on a second
    /// attempt); protocol and argument failures are not.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Engine(_))
    }

    /// Whether the failure compromises the output stream itself.
    ///
    /// A frame write failure means response integrity can no longer be
    /// guaranteed, so the loop must terminate instead of reporting the
    /// error in-band.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Frame(_))
    }

    /// Creates a malformed message error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedMessage {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed message error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown message type error.
    pub fn unknown_message_type(message_type: impl Into<String>) -> Self {
        Self::UnknownMessageType {
            message_type: message_type.into(),
        }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a missing capture error.
    #[must_use]
    pub const fn capture_missing(path: PathBuf) -> Self {
        Self::CaptureMissing { path }
    }
}
