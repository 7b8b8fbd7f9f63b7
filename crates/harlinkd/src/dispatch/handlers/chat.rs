//! `chat` handler: one agent turn against a stored capture.

use std::io::Write;

use tracing::{debug, info};

use crate::bridge;
use crate::dispatch::errors::DispatchError;
use crate::dispatch::host::HostContext;
use crate::dispatch::request::MessageEnvelope;
use crate::dispatch::response::{Response, ResponseWriter};
use crate::dispatch::router::DISPATCH_TARGET;
use crate::engine::ChatRequest;
use crate::session::SessionState;

/// Fallback chat summary when the agent produced no text at all.
const DEFAULT_SUMMARY: &str = "Task completed.";

/// Fallback chat content when the agent produced no text at all.
const DEFAULT_CONTENT: &str = "I've processed your request.";

/// Runs one chat turn, relaying agent events as they arrive.
///
/// The terminal `chat_response` carries the agent's accumulated text; the
/// incremental `agent_event` frames that preceded it carry the detail.
pub(crate) fn handle<W: Write>(
    context: &HostContext,
    session: &mut SessionState,
    envelope: &MessageEnvelope,
    writer: &mut ResponseWriter<W>,
) -> Result<Response, DispatchError> {
    let Some(prompt) = envelope.body_str("message") else {
        return Err(DispatchError::invalid_arguments("no message provided"));
    };
    let run_id = session
        .resolve_run_id(envelope.body_str("run_id"))
        .ok_or(DispatchError::NoActiveRun)?;

    let capture_path = context.store.capture_path(&run_id)?;
    if !context.store.has_capture(&run_id) {
        return Err(DispatchError::capture_missing(capture_path));
    }
    let scripts_dir = context.store.scripts_dir(&run_id)?;

    let model = envelope
        .body_str("model")
        .map(str::to_owned)
        .or_else(|| context.config.model.clone());

    info!(target: DISPATCH_TARGET, run_id, model = model.as_deref(), "starting chat turn");
    let stream = context.chat.chat(ChatRequest {
        run_id: run_id.clone(),
        prompt: prompt.to_owned(),
        capture_path,
        scripts_dir,
        model,
        allowed_tools: context.config.allowed_tools.clone(),
    })?;

    let outcome = bridge::relay_chat(stream, writer, envelope.callback_id())?;
    if !outcome.usage.is_empty() {
        debug!(target: DISPATCH_TARGET, run_id, usage = ?outcome.usage, "chat turn usage");
    }
    session.set_current_run(&run_id);

    let text = outcome.final_text.trim();
    if text.is_empty() {
        Ok(Response::ChatResponse {
            message: DEFAULT_SUMMARY.to_owned(),
            content: DEFAULT_CONTENT.to_owned(),
        })
    } else {
        Ok(Response::ChatResponse {
            message: text.to_owned(),
            content: text.to_owned(),
        })
    }
}
