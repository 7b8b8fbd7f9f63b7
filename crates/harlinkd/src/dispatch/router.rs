//! Message-type routing for the dispatch loop.
//!
//! The router owns the fixed registry mapping a message's `type` to its
//! handler. Unknown or absent types are rejected with structured errors
//! that still echo the request's callback token.

use std::io::Write;

use tracing::debug;

use crate::session::SessionState;

use super::errors::DispatchError;
use super::handlers;
use super::host::HostContext;
use super::request::MessageEnvelope;
use super::response::{Response, ResponseWriter};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Known inbound message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Liveness and configuration check.
    Status,
    /// Persist a capture for a run.
    SaveHar,
    /// Generate an API client from a stored capture.
    Generate,
    /// One agent chat turn against a stored capture.
    Chat,
}

impl MessageKind {
    /// Parses a wire `type` value.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMessageType`] if the value does not
    /// match any registered handler.
    pub fn parse(value: &str) -> Result<Self, DispatchError> {
        match value {
            "status" => Ok(Self::Status),
            "saveHar" => Ok(Self::SaveHar),
            "generate" => Ok(Self::Generate),
            "chat" => Ok(Self::Chat),
            _ => Err(DispatchError::unknown_message_type(value)),
        }
    }

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::SaveHar => "saveHar",
            Self::Generate => "generate",
            Self::Chat => "chat",
        }
    }
}

/// Routes decoded messages to their handlers.
#[derive(Debug, Default)]
pub struct MessageRouter;

impl MessageRouter {
    /// Creates a new router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Routes one message, returning its terminal response.
    ///
    /// Handlers that stream intermediate events write them through
    /// `writer` before returning; the caller frames the terminal response
    /// afterwards, preserving event-before-terminal ordering.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for unknown types and handler failures;
    /// the caller converts these into framed `error` responses.
    pub fn route<W: Write>(
        &self,
        context: &HostContext,
        session: &mut SessionState,
        envelope: &MessageEnvelope,
        writer: &mut ResponseWriter<W>,
    ) -> Result<Response, DispatchError> {
        let message_type = envelope
            .message_type()
            .ok_or_else(|| DispatchError::unknown_message_type("(missing)"))?;
        let kind = MessageKind::parse(message_type)?;

        debug!(
            target: DISPATCH_TARGET,
            message_type = kind.as_str(),
            has_callback = envelope.callback_id().is_some(),
            "dispatching message"
        );

        match kind {
            MessageKind::Status => Ok(handlers::status::handle(context)),
            MessageKind::SaveHar => handlers::save_capture::handle(context, session, envelope),
            MessageKind::Generate => handlers::generate::handle(context, session, envelope, writer),
            MessageKind::Chat => handlers::chat::handle(context, session, envelope, writer),
        }
    }
}
