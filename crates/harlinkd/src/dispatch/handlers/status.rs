//! `status` handler: liveness and configuration report.

use harlink_config::default_config_path;

use crate::dispatch::host::HostContext;
use crate::dispatch::response::Response;

/// Reports the host version and the configuration path in effect.
///
/// The handler reads no session state and cannot fail; reaching it at all
/// proves the transport and dispatch layers are working.
pub(crate) fn handle(context: &HostContext) -> Response {
    let config_path = context
        .config
        .source_path()
        .map_or_else(default_config_path, ToOwned::to_owned);
    Response::status(
        env!("CARGO_PKG_VERSION"),
        config_path.display().to_string(),
    )
}
