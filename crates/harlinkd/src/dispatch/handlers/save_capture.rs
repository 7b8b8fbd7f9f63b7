//! `saveHar` handler: persist a capture and adopt its run.

use tracing::info;

use crate::dispatch::errors::DispatchError;
use crate::dispatch::host::HostContext;
use crate::dispatch::request::MessageEnvelope;
use crate::dispatch::response::Response;
use crate::dispatch::router::DISPATCH_TARGET;
use crate::session::SessionState;

/// Persists the supplied capture under its run id.
///
/// A successful save makes the run the session's current run, so later
/// `generate` and `chat` requests may omit the id.
pub(crate) fn handle(
    context: &HostContext,
    session: &mut SessionState,
    envelope: &MessageEnvelope,
) -> Result<Response, DispatchError> {
    let (Some(run_id), Some(har)) = (envelope.body_str("run_id"), envelope.body_value("har"))
    else {
        return Err(DispatchError::invalid_arguments("missing run_id or har data"));
    };

    let path = context.store.save_capture(run_id, har)?;
    session.set_current_run(run_id);

    info!(
        target: DISPATCH_TARGET,
        run_id,
        path = %path.display(),
        "capture saved"
    );
    Ok(Response::capture_saved(path.display().to_string()))
}
