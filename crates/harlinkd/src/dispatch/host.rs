//! The read-dispatch-write loop at the heart of the host.
//!
//! One request is serviced at a time: the loop reads a frame, decodes it,
//! routes it, and writes every resulting frame before reading again. All
//! failures short of end-of-stream or a broken output stream become framed
//! `error` responses; the loop itself only ends on clean EOF or a
//! transport failure.

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{error, info, warn};

use harlink_config::Config;

use crate::engine::{ChatEngine, GenerationEngine};
use crate::session::{RunRegistry, SessionState};
use crate::store::RunStore;
use crate::transport::{FrameError, read_frame};

use super::errors::DispatchError;
use super::request::MessageEnvelope;
use super::response::{Response, ResponseWriter};
use super::router::MessageRouter;

const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Shared collaborators handed to every handler.
pub struct HostContext {
    /// Resolved configuration.
    pub config: Config,
    /// Run artefact persistence.
    pub store: Box<dyn RunStore>,
    /// Registry of completed runs.
    pub registry: RunRegistry,
    /// Engine driving generation runs.
    pub generation: Box<dyn GenerationEngine>,
    /// Engine driving chat turns.
    pub chat: Box<dyn ChatEngine>,
}

/// The host's dispatch loop and its session state.
pub struct HostLoop {
    context: HostContext,
    session: SessionState,
    router: MessageRouter,
}

impl HostLoop {
    /// Creates a loop over the given collaborators with an empty session.
    #[must_use]
    pub fn new(context: HostContext) -> Self {
        Self {
            context,
            session: SessionState::new(),
            router: MessageRouter::new(),
        }
    }

    /// Services requests until the input stream closes.
    ///
    /// Clean end-of-stream is the success path. Malformed or failing
    /// requests are reported in-band and the loop continues; only a
    /// transport failure aborts it. A request cannot be cancelled once
    /// dispatched: the loop does not read again until its handler has
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if reading a frame fails with anything other
    /// than end-of-stream, or if a response cannot be written.
    pub fn run<R: Read, W: Write>(&mut self, mut input: R, output: W) -> Result<(), HostError> {
        let mut writer = ResponseWriter::new(output);
        info!(target: HOST_TARGET, "host started");

        loop {
            let payload = match read_frame(&mut input) {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    info!(target: HOST_TARGET, "input stream closed; shutting down");
                    return Ok(());
                }
                Err(source) => {
                    error!(target: HOST_TARGET, error = %source, "transport failure");
                    return Err(HostError::Transport(source));
                }
            };

            let envelope = match MessageEnvelope::parse(&payload) {
                Ok(envelope) => envelope,
                Err(failure) => {
                    warn!(target: HOST_TARGET, error = %failure, "rejecting malformed message");
                    report(&mut writer, &failure, None)?;
                    continue;
                }
            };
            let callback_id = envelope.callback_id().cloned();

            match self
                .router
                .route(&self.context, &mut self.session, &envelope, &mut writer)
            {
                Ok(response) => writer
                    .write(&response, callback_id.as_ref())
                    .map_err(HostError::Write)?,
                Err(failure) if failure.is_transport_failure() => {
                    error!(target: HOST_TARGET, error = %failure, "transport failure");
                    return Err(HostError::Write(failure));
                }
                Err(failure) => {
                    warn!(target: HOST_TARGET, error = %failure, "request failed");
                    report(&mut writer, &failure, callback_id.as_ref())?;
                }
            }
        }
    }
}

fn report<W: Write>(
    writer: &mut ResponseWriter<W>,
    failure: &DispatchError,
    callback_id: Option<&serde_json::Value>,
) -> Result<(), HostError> {
    writer
        .write(&Response::from_dispatch_error(failure), callback_id)
        .map_err(HostError::Write)
}

/// Unrecoverable dispatch loop failures.
#[derive(Debug, Error)]
pub enum HostError {
    /// Reading from the input stream failed mid-frame.
    #[error("transport failure: {0}")]
    Transport(#[from] FrameError),
    /// Writing a response to the output stream failed.
    #[error("failed to write response: {0}")]
    Write(#[source] DispatchError),
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::engine::{MockChatEngine, MockGenerationEngine};
    use crate::store::FsRunStore;
    use crate::transport::{read_frame, write_frame};

    use super::*;

    fn test_context(dir: &TempDir) -> HostContext {
        HostContext {
            config: Config::default(),
            store: Box::new(FsRunStore::new(dir.path())),
            registry: RunRegistry::new(dir.path().join("runs.json")),
            generation: Box::new(MockGenerationEngine::new()),
            chat: Box::new(MockChatEngine::new()),
        }
    }

    fn encode(messages: &[Value]) -> Vec<u8> {
        let mut input = Vec::new();
        for message in messages {
            let payload = serde_json::to_vec(message).expect("encode message");
            write_frame(&mut input, &payload).expect("write frame");
        }
        input
    }

    fn decode(output: Vec<u8>) -> Vec<Value> {
        let mut reader = Cursor::new(output);
        let mut responses = Vec::new();
        while let Some(payload) = read_frame(&mut reader).expect("read frame") {
            responses.push(serde_json::from_slice(&payload).expect("valid JSON"));
        }
        responses
    }

    #[test]
    fn empty_input_shuts_down_cleanly() {
        let dir = TempDir::new().expect("temp dir");
        let mut output = Vec::new();

        let mut host = HostLoop::new(test_context(&dir));
        host.run(Cursor::new(Vec::new()), &mut output)
            .expect("clean shutdown");
        assert!(output.is_empty());
    }

    #[test]
    fn status_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let input = encode(&[json!({"type": "status", "_callbackId": "cb-7"})]);
        let mut output = Vec::new();

        let mut host = HostLoop::new(test_context(&dir));
        host.run(Cursor::new(input), &mut output).expect("run");

        let responses = decode(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["type"], "status");
        assert_eq!(responses[0]["connected"], true);
        assert_eq!(responses[0]["_callbackId"], "cb-7");
    }

    #[test]
    fn malformed_frame_does_not_kill_the_loop() {
        let dir = TempDir::new().expect("temp dir");
        let mut input = Vec::new();
        write_frame(&mut input, b"this is not json").expect("write frame");
        input.extend_from_slice(&encode(&[json!({"type": "status"})]));
        let mut output = Vec::new();

        let mut host = HostLoop::new(test_context(&dir));
        host.run(Cursor::new(input), &mut output).expect("run");

        let responses = decode(output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["type"], "error");
        assert_eq!(responses[1]["type"], "status");
    }

    #[test]
    fn unknown_type_echoes_the_callback() {
        let dir = TempDir::new().expect("temp dir");
        let input = encode(&[json!({"type": "bogus", "_callbackId": "cb-9"})]);
        let mut output = Vec::new();

        let mut host = HostLoop::new(test_context(&dir));
        host.run(Cursor::new(input), &mut output).expect("run");

        let responses = decode(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["type"], "error");
        assert_eq!(responses[0]["_callbackId"], "cb-9");
        let message = responses[0]["message"].as_str().expect("message");
        assert!(message.contains("bogus"));
    }

    #[test]
    fn oversized_frame_length_aborts_the_loop() {
        let dir = TempDir::new().expect("temp dir");
        let mut input = Vec::new();
        input.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut output = Vec::new();

        let mut host = HostLoop::new(test_context(&dir));
        let error = host
            .run(Cursor::new(input), &mut output)
            .expect_err("corrupt stream");
        assert!(matches!(error, HostError::Transport(_)));
    }
}
