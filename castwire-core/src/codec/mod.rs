//! Frame codec.
//!
//! [`CastCodec`] plugs the wire format into `tokio_util::codec` for
//! stream-oriented consumers. [`build_and_send`] is the sender's write
//! path: one frame, one write on the connection.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::error::CastError;
use crate::frame::{Frame, Payload};
use crate::header::{self, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::namespace::Namespace;
use crate::network::Connection;

#[derive(Debug, Default, Clone, Copy)]
pub struct CastCodec;

impl tokio_util::codec::Decoder for CastCodec {
    type Item = Frame;
    type Error = CastError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(declared) = header::decode_length(src) else {
            return Ok(None);
        };
        let declared = declared as usize;
        if declared > MAX_PAYLOAD_SIZE {
            return Err(CastError::FrameTooLarge {
                size: declared,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if src.len() < HEADER_SIZE + declared {
            src.reserve(HEADER_SIZE + declared - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(declared);
        Frame::from_body(&body).map(Some)
    }
}

impl tokio_util::codec::Encoder<Frame> for CastCodec {
    type Error = CastError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.to_bytes()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Wrap `payload` in a frame from this sender and write it.
///
/// Fails if the frame cannot be serialized or if the transport accepted
/// fewer bytes than the frame occupies.
pub async fn build_and_send<S>(
    conn: &mut Connection<S>,
    namespace: Namespace,
    payload: Payload,
    destination_id: &str,
) -> Result<(), CastError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let frame = Frame::outgoing(namespace, destination_id, payload);
    let bytes = frame.to_bytes()?;

    debug!(
        namespace = %namespace,
        destination = destination_id,
        payload = ?frame.payload(),
        "sending message"
    );

    let written = match conn.send(&bytes).await {
        Ok(n) => n,
        Err(e) => {
            warn!("failed to send {namespace} message: {e}");
            return Err(e);
        }
    };
    if written != bytes.len() {
        warn!("failed to send {namespace} message: short write");
        return Err(CastError::ShortWrite {
            written,
            expected: bytes.len(),
        });
    }
    Ok(())
}
