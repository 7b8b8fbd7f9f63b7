//! Inbound message decoding.
//!
//! A frame payload decodes into a [`MessageEnvelope`]: the `type`
//! discriminator, the optional `_callbackId` correlation token, and the
//! remaining body fields left untyped for the handlers. Decoding validates
//! structure only — a message whose `type` is not in the vocabulary is still
//! structurally valid; vocabulary validation belongs to the router.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::DispatchError;

/// Decoded inbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEnvelope {
    /// The `type` discriminator. Absent types are rejected by the router,
    /// not the decoder.
    #[serde(rename = "type", default)]
    message_type: Option<String>,
    /// Opaque correlation token echoed verbatim on every response to this
    /// request.
    #[serde(rename = "_callbackId", default)]
    callback_id: Option<Value>,
    /// Handler-specific body fields, untyped at this layer.
    #[serde(flatten)]
    body: Map<String, Value>,
}

impl MessageEnvelope {
    /// Decodes a frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedMessage`] if the payload is not
    /// valid JSON or not a JSON object.
    pub fn parse(payload: &[u8]) -> Result<Self, DispatchError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(DispatchError::from_json_error)?;
        if !value.is_object() {
            return Err(DispatchError::malformed("payload is not a JSON object"));
        }
        serde_json::from_value(value).map_err(DispatchError::from_json_error)
    }

    /// The message's `type` discriminator, if present.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// The caller-supplied correlation token, if present.
    #[must_use]
    pub fn callback_id(&self) -> Option<&Value> {
        self.callback_id.as_ref()
    }

    /// A body field as a string, if present and a string.
    #[must_use]
    pub fn body_str(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// A raw body field, if present.
    #[must_use]
    pub fn body_value(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}
