//! `generate` handler: produce an API client from a stored capture.

use std::io::Write;

use tracing::info;

use crate::bridge;
use crate::dispatch::errors::DispatchError;
use crate::dispatch::host::HostContext;
use crate::dispatch::request::MessageEnvelope;
use crate::dispatch::response::{Response, ResponseWriter};
use crate::dispatch::router::DISPATCH_TARGET;
use crate::engine::GenerateRequest;
use crate::session::{RunRecord, SessionState};

/// Runs a generation against the run's stored capture.
///
/// Progress frames bracket the engine's own stream: an initial one before
/// the engine starts, a final one after it completes, and every engine
/// progress event relayed in between. All of them carry the request's
/// callback token and precede the terminal `complete` response.
pub(crate) fn handle<W: Write>(
    context: &HostContext,
    session: &mut SessionState,
    envelope: &MessageEnvelope,
    writer: &mut ResponseWriter<W>,
) -> Result<Response, DispatchError> {
    let run_id = session
        .resolve_run_id(envelope.body_str("run_id"))
        .ok_or(DispatchError::NoActiveRun)?;
    let model = envelope
        .body_str("model")
        .map(str::to_owned)
        .or_else(|| context.config.model.clone());

    let capture_path = context.store.capture_path(&run_id)?;
    if !context.store.has_capture(&run_id) {
        return Err(DispatchError::capture_missing(capture_path));
    }
    let output_dir = context.store.scripts_dir(&run_id)?;

    let callback = envelope.callback_id();
    writer.write(&Response::progress(10, "Analyzing capture..."), callback)?;

    info!(target: DISPATCH_TARGET, run_id, model = model.as_deref(), "starting generation");
    let stream = context.generation.generate(GenerateRequest {
        run_id: run_id.clone(),
        capture_path,
        output_dir: output_dir.clone(),
        model: model.clone(),
    })?;
    bridge::relay_generation(stream, writer, callback)?;

    writer.write(&Response::progress(100, "Generation complete"), callback)?;

    context.registry.record_run_best_effort(RunRecord::extension_run(
        &run_id,
        "Generate API client from extension capture",
        model,
    ));
    session.set_current_run(&run_id);

    Ok(Response::generation_complete(
        output_dir.display().to_string(),
        run_id,
    ))
}
