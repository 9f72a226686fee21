//! Sender lifecycle state machine.
//!
//! Tracks how far the sender has got in bringing media up on the
//! receiver. Transitions are validated and return `Result` instead of
//! panicking.

use std::time::Instant;

use crate::error::SenderError;

/// ```text
///  Idle ──► AwaitingStatus ──► Launching ──► Loading ──► Playing
///                 │                              ▲          │
///                 └────────── (app running) ─────┘          │
///   any ──► Closing ──► Closed ◄────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SenderPhase {
    /// Connected, nothing sent yet.
    #[default]
    Idle,

    /// CONNECT and GET_STATUS sent to the platform receiver.
    AwaitingStatus,

    /// LAUNCH sent; waiting for the app to show up in a status.
    Launching,

    /// LOAD sent to the app.
    Loading { transport_id: String },

    /// The receiver reported a media session.
    Playing {
        transport_id: String,
        media_session_id: String,
        since: Instant,
    },

    /// CLOSE sent; tearing down.
    Closing,

    /// Terminal.
    Closed,
}

impl std::fmt::Display for SenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingStatus => write!(f, "AwaitingStatus"),
            Self::Launching => write!(f, "Launching"),
            Self::Loading { .. } => write!(f, "Loading"),
            Self::Playing { .. } => write!(f, "Playing"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SenderPhase {
    /// The app's transport id once one is known.
    pub fn transport_id(&self) -> Option<&str> {
        match self {
            Self::Loading { transport_id } | Self::Playing { transport_id, .. } => {
                Some(transport_id)
            }
            _ => None,
        }
    }

    pub fn media_session_id(&self) -> Option<&str> {
        match self {
            Self::Playing {
                media_session_id, ..
            } => Some(media_session_id),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long media has been playing. `None` outside `Playing`.
    pub fn playing_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Playing { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Idle`.
    pub fn request_status(&mut self) -> Result<(), SenderError> {
        match self {
            Self::Idle => {
                *self = Self::AwaitingStatus;
                Ok(())
            }
            _ => Err(SenderError::ProtocolViolation(
                "cannot request status: not in Idle state",
            )),
        }
    }

    /// Valid from: `AwaitingStatus`.
    pub fn begin_launch(&mut self) -> Result<(), SenderError> {
        match self {
            Self::AwaitingStatus => {
                *self = Self::Launching;
                Ok(())
            }
            _ => Err(SenderError::ProtocolViolation(
                "cannot launch: not in AwaitingStatus state",
            )),
        }
    }

    /// Valid from: `AwaitingStatus`, `Launching`.
    pub fn begin_load(&mut self, transport_id: &str) -> Result<(), SenderError> {
        match self {
            Self::AwaitingStatus | Self::Launching => {
                *self = Self::Loading {
                    transport_id: transport_id.to_owned(),
                };
                Ok(())
            }
            _ => Err(SenderError::ProtocolViolation(
                "cannot load: app not launched",
            )),
        }
    }

    /// Record the media session reported by the app.
    ///
    /// Valid from: `Loading`, `Playing` (the session id may change).
    pub fn media_ready(&mut self, media_session_id: String) -> Result<(), SenderError> {
        match self {
            Self::Loading { transport_id } => {
                *self = Self::Playing {
                    transport_id: std::mem::take(transport_id),
                    media_session_id,
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Playing {
                media_session_id: current,
                ..
            } => {
                *current = media_session_id;
                Ok(())
            }
            _ => Err(SenderError::ProtocolViolation(
                "cannot track media: nothing loaded",
            )),
        }
    }

    /// Valid from any state except `Closing` and `Closed`.
    pub fn begin_close(&mut self) -> Result<(), SenderError> {
        match self {
            Self::Closing | Self::Closed => Err(SenderError::ProtocolViolation(
                "cannot close: already closing",
            )),
            _ => {
                *self = Self::Closing;
                Ok(())
            }
        }
    }

    /// Valid from: `Closing`.
    pub fn finish_close(&mut self) -> Result<(), SenderError> {
        match self {
            Self::Closing => {
                *self = Self::Closed;
                Ok(())
            }
            _ => Err(SenderError::ProtocolViolation(
                "cannot finish close: not in Closing state",
            )),
        }
    }

    /// Jump straight to `Closed`, e.g. after the transport failed.
    pub fn force_close(&mut self) {
        *self = Self::Closed;
    }
}
