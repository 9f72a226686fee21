//! Messages received from the device.
//!
//! Only the fields the sender acts on are modelled; everything else in
//! the receiver's JSON is ignored.

use prost::Message as _;
use serde::Deserialize;

use crate::error::CastError;
use crate::frame::{Frame, Payload};
use crate::message::DeviceAuthMessage;
use crate::namespace::Namespace;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Inbound {
    Ping,
    Pong,
    Close,
    ReceiverStatus {
        #[serde(default)]
        request_id: u32,
        status: ReceiverStatus,
    },
    MediaStatus {
        #[serde(default)]
        request_id: u32,
        #[serde(default)]
        status: Vec<MediaStatusEntry>,
    },
    LaunchError {
        #[serde(default)]
        request_id: u32,
        #[serde(default)]
        reason: Option<String>,
    },
    LoadFailed {
        #[serde(default)]
        request_id: u32,
    },
    LoadCancelled {
        #[serde(default)]
        request_id: u32,
    },
    InvalidRequest {
        #[serde(default)]
        request_id: u32,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Reply on the device-auth channel.
    #[serde(skip)]
    AuthReply(DeviceAuthMessage),
    /// Any message type the sender does not act on.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverStatus {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub volume: Option<ReceiverVolume>,
}

impl ReceiverStatus {
    /// The running app with the given id, if any.
    pub fn application(&self, app_id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.app_id == app_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub app_id: String,
    #[serde(default)]
    pub session_id: String,
    /// Destination id for media-channel traffic to this app.
    #[serde(default)]
    pub transport_id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceiverVolume {
    #[serde(default)]
    pub level: Option<f32>,
    #[serde(default)]
    pub muted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatusEntry {
    pub media_session_id: u64,
    #[serde(default)]
    pub player_state: String,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub idle_reason: Option<String>,
}

impl MediaStatusEntry {
    /// The session id in the form media commands take it.
    pub fn session_id(&self) -> String {
        self.media_session_id.to_string()
    }
}

impl Inbound {
    /// Decode a frame's payload according to its channel.
    ///
    /// Frames on channels the sender does not use, and binary payloads on
    /// JSON channels, come back as [`Inbound::Unknown`].
    pub fn parse(frame: &Frame) -> Result<Self, CastError> {
        match (frame.channel(), frame.payload()) {
            (Some(Namespace::DeviceAuth), Payload::Binary(bytes)) => {
                Ok(Inbound::AuthReply(DeviceAuthMessage::decode(bytes.as_slice())?))
            }
            (Some(_), Payload::Text(text)) => Ok(serde_json::from_str(text)?),
            _ => Ok(Inbound::Unknown),
        }
    }

    /// The `requestId` carried by replies to tracked commands.
    ///
    /// Unsolicited status broadcasts carry id 0, which only matches a
    /// pending request if id 0 is actually outstanding.
    pub fn request_id(&self) -> Option<u32> {
        match self {
            Inbound::ReceiverStatus { request_id, .. }
            | Inbound::MediaStatus { request_id, .. }
            | Inbound::LaunchError { request_id, .. }
            | Inbound::LoadFailed { request_id }
            | Inbound::LoadCancelled { request_id }
            | Inbound::InvalidRequest { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}
