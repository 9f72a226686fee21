//! Protocol channels and fixed identities.
//!
//! Every CASTV2 frame is routed by a namespace URN. The sender only ever
//! talks on the five channels below.

use std::fmt;
use std::str::FromStr;

use crate::error::CastError;

// ── Identities ───────────────────────────────────────────────────

/// Source id stamped on every outgoing frame.
pub const SENDER_ID: &str = "sender-0";

/// Destination id of the receiver platform itself.
pub const DEFAULT_RECEIVER_ID: &str = "receiver-0";

/// Application id of the Default Media Receiver.
pub const MEDIA_RECEIVER_APP_ID: &str = "CC1AD845";

/// TLS control port used when the caller passes port 0.
pub const DEFAULT_CONTROL_PORT: u16 = 8009;

// ── Namespace ────────────────────────────────────────────────────

/// A logical protocol channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Device authentication challenge (binary payloads).
    DeviceAuth,
    /// PING / PONG keepalive.
    Heartbeat,
    /// Virtual connection open / close.
    Connection,
    /// Receiver platform control: status and app launch.
    Receiver,
    /// Media playback control inside the launched app.
    Media,
}

impl Namespace {
    /// All channels, in protocol order.
    pub const ALL: [Namespace; 5] = [
        Namespace::DeviceAuth,
        Namespace::Heartbeat,
        Namespace::Connection,
        Namespace::Receiver,
        Namespace::Media,
    ];

    /// The URN carried in the `namespace` field of a frame.
    pub fn urn(&self) -> &'static str {
        match self {
            Namespace::DeviceAuth => "urn:x-cast:com.google.cast.tp.deviceauth",
            Namespace::Heartbeat => "urn:x-cast:com.google.cast.tp.heartbeat",
            Namespace::Connection => "urn:x-cast:com.google.cast.tp.connection",
            Namespace::Receiver => "urn:x-cast:com.google.cast.receiver",
            Namespace::Media => "urn:x-cast:com.google.cast.media",
        }
    }
}

impl FromStr for Namespace {
    type Err = CastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.urn() == s)
            .ok_or(CastError::InvalidParameter("unknown namespace"))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.urn())
    }
}
