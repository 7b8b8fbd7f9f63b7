//! Outbound response vocabulary and framing.
//!
//! Responses serialize as JSON objects with a `type` drawn from a closed
//! vocabulary: `status`, `complete`, `error`, `progress`, `agent_event`,
//! `chat_response`. The [`ResponseWriter`] frames each response and flushes
//! before returning, so an outbound message is never partially written when
//! the dispatcher resumes reading.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::engine::AgentEvent;
use crate::transport::write_frame;

use super::errors::DispatchError;

/// Outbound response payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Host liveness and configuration report.
    Status {
        connected: bool,
        version: String,
        config_path: String,
    },
    /// Terminal success for `saveHar` (capture path) or `generate`
    /// (scripts path plus run id).
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        script_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },
    /// Terminal failure with a human-readable message and an optional
    /// retry hint.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retryable: Option<bool>,
    },
    /// Intermediate generation progress.
    Progress { message: String, percent: u8 },
    /// One relayed agent event, sub-typed by its `event_type` field.
    AgentEvent {
        #[serde(flatten)]
        event: AgentEvent,
    },
    /// Terminal success for a chat turn.
    ChatResponse { message: String, content: String },
}

impl Response {
    /// Creates a status report.
    pub fn status(version: impl Into<String>, config_path: impl Into<String>) -> Self {
        Self::Status {
            connected: true,
            version: version.into(),
            config_path: config_path.into(),
        }
    }

    /// Creates a capture-saved completion.
    pub fn capture_saved(path: impl Into<String>) -> Self {
        Self::Complete {
            path: Some(path.into()),
            script_path: None,
            run_id: None,
        }
    }

    /// Creates a generation completion.
    pub fn generation_complete(script_path: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::Complete {
            path: None,
            script_path: Some(script_path.into()),
            run_id: Some(run_id.into()),
        }
    }

    /// Creates an error response without a retry hint.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            retryable: None,
        }
    }

    /// Creates a progress update.
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
            percent,
        }
    }

    /// Creates a relayed agent event.
    #[must_use]
    pub const fn agent_event(event: AgentEvent) -> Self {
        Self::AgentEvent { event }
    }

    /// Converts a dispatch failure into its wire representation. The
    /// retry hint is emitted only when set, matching the "defaults to
    /// false" contract.
    #[must_use]
    pub fn from_dispatch_error(error: &DispatchError) -> Self {
        Self::Error {
            message: error.to_string(),
            retryable: error.retryable().then_some(true),
        }
    }
}

/// Writer that frames responses onto the output stream.
///
/// Shared by the dispatcher (terminal responses) and the streaming bridge
/// (intermediate events): both go through [`ResponseWriter::write`], so
/// handler return values and bridge-emitted events can never interleave
/// mid-frame.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a writer over the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Frames and flushes one response, echoing the originating request's
    /// callback token when present.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if serialization or the frame write fails.
    pub fn write(
        &mut self,
        response: &Response,
        callback_id: Option<&Value>,
    ) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(&Outbound {
            response,
            callback_id,
        })?;
        write_frame(&mut self.writer, &payload)?;
        Ok(())
    }
}

/// Wire envelope pairing a response with the echoed callback token.
#[derive(Serialize)]
struct Outbound<'a> {
    #[serde(flatten)]
    response: &'a Response,
    #[serde(rename = "_callbackId", skip_serializing_if = "Option::is_none")]
    callback_id: Option<&'a Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::transport::read_frame;

    use super::*;

    fn written(response: &Response, callback_id: Option<&Value>) -> Value {
        let mut output = Vec::new();
        let mut writer = ResponseWriter::new(&mut output);
        writer.write(response, callback_id).expect("write response");

        let mut reader = std::io::Cursor::new(output);
        let payload = read_frame(&mut reader)
            .expect("read frame")
            .expect("one frame");
        serde_json::from_slice(&payload).expect("valid JSON payload")
    }

    #[test]
    fn status_uses_wire_type_tag() {
        let value = written(&Response::status("1.2.3", "/etc/harlink.toml"), None);
        assert_eq!(value["type"], "status");
        assert_eq!(value["connected"], true);
        assert_eq!(value["version"], "1.2.3");
    }

    #[test]
    fn callback_token_is_echoed_verbatim() {
        let token = json!({"nested": [1, 2]});
        let value = written(&Response::error("boom"), Some(&token));
        assert_eq!(value["_callbackId"], token);
    }

    #[test]
    fn callback_field_is_omitted_when_absent() {
        let value = written(&Response::error("boom"), None);
        assert!(value.get("_callbackId").is_none());
    }

    #[test]
    fn agent_event_flattens_event_type() {
        let event = AgentEvent::Text {
            content: "hello".to_owned(),
        };
        let value = written(&Response::agent_event(event), None);
        assert_eq!(value["type"], "agent_event");
        assert_eq!(value["event_type"], "text");
        assert_eq!(value["content"], "hello");
    }

    #[test]
    fn retry_hint_is_omitted_unless_set() {
        let plain = written(
            &Response::from_dispatch_error(&DispatchError::NoActiveRun),
            None,
        );
        assert!(plain.get("retryable").is_none());

        let engine_error =
            DispatchError::Engine(crate::engine::EngineError::failed("agent crashed"));
        let retryable = written(&Response::from_dispatch_error(&engine_error), None);
        assert_eq!(retryable["retryable"], true);
    }

    #[test]
    fn complete_omits_unused_fields() {
        let value = written(&Response::capture_saved("/data/recording.har"), None);
        assert_eq!(value["type"], "complete");
        assert_eq!(value["path"], "/data/recording.har");
        assert!(value.get("script_path").is_none());
        assert!(value.get("run_id").is_none());
    }
}
