//! Message dispatch for the native messaging host.
//!
//! Layering mirrors the wire: [`request`] decodes inbound frames into
//! envelopes, [`router`] maps the `type` discriminator onto a handler,
//! [`handlers`] implement the vocabulary, and [`response`] frames what
//! goes back. [`host`] ties them into the blocking read-dispatch-write
//! loop that `main` runs over stdin and stdout.

mod errors;
mod handlers;
mod host;
mod request;
mod response;
mod router;

pub use errors::DispatchError;
pub use host::{HostContext, HostError, HostLoop};
pub use request::MessageEnvelope;
pub use response::{Response, ResponseWriter};
pub use router::{MessageKind, MessageRouter};
