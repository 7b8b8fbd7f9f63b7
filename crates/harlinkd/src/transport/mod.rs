//! Native messaging frame codec.
//!
//! The transport module reads and writes the length-prefixed binary frames
//! the browser exchanges with the host over stdin/stdout.

mod frame;

pub use self::frame::{FrameError, MAX_FRAME_BYTES, read_frame, write_frame};
