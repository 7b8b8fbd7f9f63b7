//! Native messaging host for the harlink capture extension.
//!
//! The host is launched by the browser and speaks the native messaging wire
//! protocol over stdin/stdout: each frame is a 4-byte little-endian length
//! followed by a UTF-8 JSON payload. Inbound messages carry a `type`
//! discriminator (`status`, `saveHar`, `generate`, `chat`) and an optional
//! `_callbackId` correlation token which is echoed on every response.
//!
//! Requests are handled strictly one at a time. Handlers that drive the
//! external agent relay its incremental events as independently framed
//! `agent_event` and `progress` messages before returning a single terminal
//! response, so an observer of the stream sees all intermediate events for a
//! request before that request's terminal frame. A failed request is
//! reported as a framed `error` response and never terminates the host; the
//! process exits cleanly (code 0) only when the browser closes the stream.
//!
//! Logging goes exclusively to stderr — stdout belongs to the wire.

mod bootstrap;
pub mod bridge;
pub mod dispatch;
pub mod engine;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod transport;

use std::io;

use thiserror::Error;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{HostContext, HostError, HostLoop};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Errors surfaced by the top-level host entry point.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bootstrap failed before the message loop could start.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The message loop terminated abnormally.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Bootstraps the host from the system configuration and drives the message
/// loop over stdin/stdout until the browser closes the stream.
///
/// # Errors
///
/// Returns [`RunError`] if bootstrap fails or the loop terminates on a
/// transport failure. A clean end-of-stream is not an error.
pub fn run() -> Result<(), RunError> {
    let mut host = bootstrap_with(&SystemConfigLoader)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    host.run(&mut stdin.lock(), &mut stdout.lock())?;
    Ok(())
}
