//! Protobuf messages carried inside frames.
//!
//! Field numbers follow the `cast_channel.proto` schema used by receiver
//! devices. Only the messages the sender actually produces or inspects
//! are defined here.

/// The envelope of every frame body.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CastMessage {
    #[prost(enumeration = "ProtocolVersion", required, tag = "1")]
    pub protocol_version: i32,
    #[prost(string, required, tag = "2")]
    pub source_id: String,
    #[prost(string, required, tag = "3")]
    pub destination_id: String,
    #[prost(string, required, tag = "4")]
    pub namespace: String,
    #[prost(enumeration = "PayloadType", required, tag = "5")]
    pub payload_type: i32,
    #[prost(string, optional, tag = "6")]
    pub payload_utf8: Option<String>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub payload_binary: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ProtocolVersion {
    Castv210 = 0,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PayloadType {
    String = 0,
    Binary = 1,
}

// ── Device auth ──────────────────────────────────────────────────

/// Empty challenge; the receiver answers with its certificate chain.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthChallenge {}

/// Receiver's answer to an [`AuthChallenge`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthResponse {
    #[prost(bytes = "vec", required, tag = "1")]
    pub signature: Vec<u8>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub client_auth_certificate: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthError {
    #[prost(int32, required, tag = "1")]
    pub error_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceAuthMessage {
    #[prost(message, optional, tag = "1")]
    pub challenge: Option<AuthChallenge>,
    #[prost(message, optional, tag = "2")]
    pub response: Option<AuthResponse>,
    #[prost(message, optional, tag = "3")]
    pub error: Option<AuthError>,
}

impl DeviceAuthMessage {
    /// A message holding only an empty challenge.
    pub fn challenge() -> Self {
        Self {
            challenge: Some(AuthChallenge {}),
            response: None,
            error: None,
        }
    }
}
