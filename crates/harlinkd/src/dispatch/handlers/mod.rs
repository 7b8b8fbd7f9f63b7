//! Handlers for the inbound message vocabulary.
//!
//! Each submodule implements one message type. Handlers receive the shared
//! [`HostContext`](super::host::HostContext), the mutable session state,
//! and the decoded envelope; streaming handlers additionally write
//! intermediate frames through the response writer before returning their
//! terminal response.

pub(crate) mod chat;
pub(crate) mod generate;
pub(crate) mod save_capture;
pub(crate) mod status;
