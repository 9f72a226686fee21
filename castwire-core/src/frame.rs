//! Routed protocol frames.
//!
//! A [`Frame`] is the decoded form of one [`CastMessage`]: routing
//! metadata plus exactly one payload. The payload enum makes a frame
//! carrying both a text and a binary body unrepresentable.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use prost::Message;

use crate::error::CastError;
use crate::header::{self, HEADER_SIZE};
use crate::message::{CastMessage, PayloadType, ProtocolVersion};
use crate::namespace::{Namespace, SENDER_ID};

// ── Payload ──────────────────────────────────────────────────────

/// Which payload field a frame populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Text,
    Binary,
}

/// Frame body: UTF-8 JSON on every channel but device-auth.
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::Binary(_) => PayloadKind::Binary,
        }
    }

    /// The text body, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Binary(_) => None,
        }
    }

    /// Raw bytes of either variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Payload::Binary(b) => write!(f, "Binary({} bytes)", b.len()),
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    namespace: String,
    source_id: String,
    destination_id: String,
    payload: Payload,
}

impl Frame {
    pub fn new(
        namespace: impl Into<String>,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            payload,
        }
    }

    /// A frame sent by this sender on `namespace`.
    pub fn outgoing(namespace: Namespace, destination_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(namespace.urn(), SENDER_ID, destination_id, payload)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The namespace as a known channel, if it is one.
    pub fn channel(&self) -> Option<Namespace> {
        self.namespace.parse().ok()
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Build the protobuf envelope for this frame.
    pub fn to_message(&self) -> CastMessage {
        let (payload_type, payload_utf8, payload_binary) = match &self.payload {
            Payload::Text(s) => (PayloadType::String, Some(s.clone()), None),
            Payload::Binary(b) => (PayloadType::Binary, None, Some(b.clone())),
        };
        CastMessage {
            protocol_version: ProtocolVersion::Castv210 as i32,
            source_id: self.source_id.clone(),
            destination_id: self.destination_id.clone(),
            namespace: self.namespace.clone(),
            payload_type: payload_type as i32,
            payload_utf8,
            payload_binary,
        }
    }

    /// Serialize to a length-prefixed wire frame.
    pub fn to_bytes(&self) -> Result<Bytes, CastError> {
        let msg = self.to_message();
        let body_len = msg.encoded_len();
        let prefix = header::encode_length(body_len)?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_len);
        buf.put_slice(&prefix);
        msg.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a frame body (without its length prefix).
    pub fn from_body(body: &[u8]) -> Result<Self, CastError> {
        Self::try_from(CastMessage::decode(body)?)
    }
}

impl TryFrom<CastMessage> for Frame {
    type Error = CastError;

    fn try_from(msg: CastMessage) -> Result<Self, Self::Error> {
        if ProtocolVersion::try_from(msg.protocol_version).is_err() {
            return Err(CastError::UnsupportedVersion(msg.protocol_version));
        }
        let payload_type =
            PayloadType::try_from(msg.payload_type).map_err(|_| CastError::UnknownVariant {
                type_name: "PayloadType",
                value: msg.payload_type as i64,
            })?;
        let payload = match payload_type {
            PayloadType::String => Payload::Text(msg.payload_utf8.unwrap_or_default()),
            PayloadType::Binary => Payload::Binary(msg.payload_binary.unwrap_or_default()),
        };
        Ok(Self {
            namespace: msg.namespace,
            source_id: msg.source_id,
            destination_id: msg.destination_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MAX_PAYLOAD_SIZE;
    use crate::namespace::DEFAULT_RECEIVER_ID;

    #[test]
    fn text_frame_roundtrip() {
        let frame = Frame::outgoing(
            Namespace::Heartbeat,
            DEFAULT_RECEIVER_ID,
            Payload::Text(r#"{"type":"PING"}"#.into()),
        );
        let bytes = frame.to_bytes().unwrap();
        let declared = header::decode_length(&bytes).unwrap() as usize;
        assert_eq!(declared, bytes.len() - HEADER_SIZE);

        let decoded = Frame::from_body(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.source_id(), SENDER_ID);
        assert_eq!(decoded.channel(), Some(Namespace::Heartbeat));
    }

    #[test]
    fn binary_frame_roundtrip() {
        let frame = Frame::new(
            "urn:x-cast:com.example.blob",
            "peer-7",
            "web-3",
            Payload::Binary(vec![0, 1, 2, 0xFF]),
        );
        let bytes = frame.to_bytes().unwrap();
        let decoded = Frame::from_body(&bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded.payload_kind(), PayloadKind::Binary);
        assert_eq!(decoded.payload().as_bytes(), &[0, 1, 2, 0xFF]);
        assert_eq!(decoded.channel(), None);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn only_one_payload_field_is_populated() {
        let msg = Frame::outgoing(Namespace::DeviceAuth, "receiver-0", Payload::Binary(vec![1]))
            .to_message();
        assert!(msg.payload_utf8.is_none());
        assert_eq!(msg.payload_binary.as_deref(), Some(&[1u8][..]));
    }

    #[test]
    fn oversized_frame_rejected_on_encode() {
        let frame = Frame::outgoing(
            Namespace::Media,
            "web-1",
            Payload::Text("x".repeat(MAX_PAYLOAD_SIZE)),
        );
        assert!(matches!(
            frame.to_bytes(),
            Err(CastError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn unknown_payload_type_rejected() {
        let mut msg = Frame::outgoing(Namespace::Media, "web-1", Payload::Text("{}".into()))
            .to_message();
        msg.payload_type = 9;
        assert!(matches!(
            Frame::try_from(msg),
            Err(CastError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(
            Frame::from_body(&[0xFF, 0xFF, 0xFF]),
            Err(CastError::Decode(_))
        ));
    }
}
