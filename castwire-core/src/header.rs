//! Length prefix carried in front of every frame.
//!
//! ```text
//! +------------------------------------+------------------------------+
//! | payload size (u32 big endian)      | CastMessage (protobuf)       |
//! +------------------------------------+------------------------------+
//! ```

use crate::error::CastError;

/// Size of the length prefix.
pub const HEADER_SIZE: usize = 4;

/// Largest frame accepted in either direction, prefix included.
pub const MAX_FRAME_SIZE: usize = 10 * 1024;

/// Largest message body accepted in either direction.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

pub type HeaderBytes = [u8; HEADER_SIZE];

/// Encode a body length into a prefix.
///
/// Fails if the body would not fit in a frame.
pub fn encode_length(len: usize) -> Result<HeaderBytes, CastError> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(CastError::FrameTooLarge {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    // MAX_PAYLOAD_SIZE fits in u32.
    Ok((len as u32).to_be_bytes())
}

/// Decode the declared body length from the first [`HEADER_SIZE`] bytes.
///
/// Returns `None` if fewer bytes are available. The value is not
/// checked against [`MAX_PAYLOAD_SIZE`]; that is the reassembler's call.
pub fn decode_length(bytes: &[u8]) -> Option<u32> {
    let prefix: HeaderBytes = bytes.get(..HEADER_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}
