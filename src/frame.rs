//! Length-prefixed frame codec.
//!
//! Every datagram in both directions carries exactly one frame:
//!
//! ```text
//! [u32 big-endian length][UTF-8 JSON payload of exactly `length` bytes]
//!
//! Example:
//! 00 00 00 12 {"command":"TOPO"}
//! ```
//!
//! The length counts payload bytes only, never the 4-byte header.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

/// Frame codec errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Datagram too short to hold the length prefix
    Truncated(usize),
    /// Declared length does not match the payload size
    LengthMismatch { declared: u32, actual: usize },
    /// Payload is not valid UTF-8
    InvalidUtf8,
    /// Payload too long for the length prefix
    TooLarge(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated(len) => {
                write!(f, "datagram of {len} bytes is shorter than the length prefix")
            }
            FrameError::LengthMismatch { declared, actual } => {
                write!(f, "lengths not equal: declared {declared}, actual {actual}")
            }
            FrameError::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            FrameError::TooLarge(len) => {
                write!(f, "payload of {len} bytes does not fit a u32 length prefix")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Decode a single frame, returning the payload text.
pub fn decode_frame(input: &[u8]) -> Result<&str, FrameError> {
    if input.len() < HEADER_LEN {
        return Err(FrameError::Truncated(input.len()));
    }

    let (header, payload) = input.split_at(HEADER_LEN);
    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);

    if declared as usize != payload.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }

    std::str::from_utf8(payload).map_err(|_| FrameError::InvalidUtf8)
}

/// Encode `text` as a frame.
///
/// Fails only when `text` is longer than `u32::MAX` bytes.
pub fn encode_frame(text: &str) -> Result<Bytes, FrameError> {
    let declared = length_prefix(text.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + text.len());
    buf.put_u32(declared);
    buf.put_slice(text.as_bytes());
    Ok(buf.freeze())
}

/// Frame with an empty payload.
pub fn empty_frame() -> Bytes {
    Bytes::from_static(&[0; HEADER_LEN])
}

fn length_prefix(len: usize) -> Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::TooLarge(len))
}
