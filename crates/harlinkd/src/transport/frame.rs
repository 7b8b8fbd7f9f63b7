//! Length-prefixed frame reading and writing.
//!
//! Each frame is a 4-byte unsigned little-endian byte count followed by a
//! payload of exactly that many bytes. No padding, no terminator, no
//! checksum. A frame is never split or coalesced with another.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Upper bound on a declared frame length.
///
/// The stream has no message boundaries of its own, so a header declaring an
/// absurd length cannot be skipped and resynchronised; it is treated as
/// stream corruption and terminates the session.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Errors surfaced by the frame codec.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Reading or writing the underlying stream failed.
    #[error("frame IO error: {0}")]
    Io(#[from] io::Error),
    /// A frame length exceeded [`MAX_FRAME_BYTES`].
    #[error("frame of {declared} bytes exceeds {max} byte limit")]
    FrameTooLarge { declared: usize, max: usize },
}

impl FrameError {
    fn too_large(declared: usize) -> Self {
        Self::FrameTooLarge {
            declared,
            max: MAX_FRAME_BYTES,
        }
    }
}

/// Reads one frame, returning its raw payload bytes.
///
/// Returns `Ok(None)` when the stream ends before a complete frame is
/// available: fewer than 4 header bytes, or fewer payload bytes than the
/// header declared. A truncated frame is indistinguishable from a closed
/// stream and is reported as end-of-stream rather than a decode error.
///
/// # Errors
///
/// Returns [`FrameError`] on IO failure or when the declared length exceeds
/// [`MAX_FRAME_BYTES`].
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0_u8; 4];
    if !read_exact_or_eof(reader, &mut header)? {
        return Ok(None);
    }

    let declared = u32::from_le_bytes(header) as usize;
    if declared > MAX_FRAME_BYTES {
        return Err(FrameError::too_large(declared));
    }

    let mut payload = vec![0_u8; declared];
    if !read_exact_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    Ok(Some(payload))
}

/// Writes one frame: the payload's 4-byte little-endian length followed by
/// the payload, then flushes the stream.
///
/// Header and payload are assembled into a single buffer and written with
/// one `write_all` call, so a frame can never interleave with another write
/// through the same handle.
///
/// # Errors
///
/// Returns [`FrameError`] on IO failure or when the payload exceeds the
/// 32-bit length field.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let length = u32::try_from(payload.len()).map_err(|_| FrameError::too_large(payload.len()))?;

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Fills `buf` from the reader, reporting `Ok(false)` when the stream ends
/// before the buffer is full.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(error) => Err(error),
    }
}
