//! Outgoing JSON control messages.
//!
//! Every builder is pure: it takes the request id to stamp and returns
//! the payload text. Keys are emitted in a fixed order with `type` first.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use prost::Message as _;
use serde::{Serialize, Serializer};

use crate::error::CastError;
use crate::message::DeviceAuthMessage;
use crate::namespace::{MEDIA_RECEIVER_APP_ID, Namespace};

/// Commands that carry a `requestId` and expect a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ReceiverGetStatus,
    Launch,
    MediaGetStatus,
    Load,
    Play,
    Pause,
    Stop,
    SetVolume,
    Seek,
}

impl Command {
    /// The channel the command is sent on.
    pub fn namespace(self) -> Namespace {
        match self {
            Command::ReceiverGetStatus | Command::Launch => Namespace::Receiver,
            _ => Namespace::Media,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::ReceiverGetStatus | Command::MediaGetStatus => "GET_STATUS",
            Command::Launch => "LAUNCH",
            Command::Load => "LOAD",
            Command::Play => "PLAY",
            Command::Pause => "PAUSE",
            Command::Stop => "STOP",
            Command::SetVolume => "SET_VOLUME",
            Command::Seek => "SEEK",
        };
        write!(f, "{name}")
    }
}

/// What to ask the media receiver to play.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadRequest {
    /// Port of the local HTTP server exposing `/stream`.
    pub port: u16,
    /// Empty means no metadata block.
    pub title: String,
    /// Only used when it is an http(s) URL.
    pub artwork: String,
    pub mime: String,
}

// ── Wire shapes ──────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
enum Message<'a> {
    Connect,
    Close,
    Ping,
    Pong,
    GetStatus {
        request_id: u32,
    },
    Launch {
        app_id: &'a str,
        request_id: u32,
    },
    Load {
        media: Media<'a>,
        autoplay: bool,
        request_id: u32,
    },
    Play {
        media_session_id: SessionRef<'a>,
        request_id: u32,
    },
    Stop {
        media_session_id: SessionRef<'a>,
        request_id: u32,
    },
    Pause {
        media_session_id: SessionRef<'a>,
        request_id: u32,
    },
    SetVolume {
        volume: Volume,
        media_session_id: SessionRef<'a>,
        request_id: u32,
    },
    Seek {
        current_time: f64,
        media_session_id: SessionRef<'a>,
        request_id: u32,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Media<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata<'a>>,
    content_id: String,
    stream_type: &'static str,
    content_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata<'a> {
    metadata_type: u8,
    title: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

#[derive(Serialize)]
struct Volume {
    level: f32,
    muted: bool,
}

/// A media session id as reported by the receiver.
///
/// Receivers hand out integers; those go back on the wire as JSON
/// numbers. Anything else is sent as a string.
struct SessionRef<'a>(&'a str);

impl<'a> SessionRef<'a> {
    fn parse(id: &'a str) -> Result<Self, CastError> {
        if id.is_empty() {
            return Err(CastError::InvalidParameter("empty media session id"));
        }
        Ok(Self(id))
    }
}

impl Serialize for SessionRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(n) => serializer.serialize_u64(n),
            Err(_) => serializer.serialize_str(self.0),
        }
    }
}

fn render(message: &Message<'_>) -> Result<String, CastError> {
    Ok(serde_json::to_string(message)?)
}

// ── Connection / heartbeat ───────────────────────────────────────

pub fn connect() -> Result<String, CastError> {
    render(&Message::Connect)
}

pub fn close() -> Result<String, CastError> {
    render(&Message::Close)
}

pub fn ping() -> Result<String, CastError> {
    render(&Message::Ping)
}

pub fn pong() -> Result<String, CastError> {
    render(&Message::Pong)
}

/// Serialized device-auth challenge (binary payload).
pub fn auth_challenge() -> Vec<u8> {
    DeviceAuthMessage::challenge().encode_to_vec()
}

// ── Receiver ─────────────────────────────────────────────────────

pub fn receiver_get_status(request_id: u32) -> Result<String, CastError> {
    render(&Message::GetStatus { request_id })
}

/// Launch the default media receiver app.
pub fn receiver_launch(request_id: u32) -> Result<String, CastError> {
    render(&Message::Launch {
        app_id: MEDIA_RECEIVER_APP_ID,
        request_id,
    })
}

// ── Media ────────────────────────────────────────────────────────

pub fn media_get_status(request_id: u32) -> Result<String, CastError> {
    render(&Message::GetStatus { request_id })
}

/// LOAD pointing the receiver at `http://<local_ip>:<port>/stream`.
pub fn media_load(
    request_id: u32,
    local_ip: IpAddr,
    load: &LoadRequest,
) -> Result<String, CastError> {
    let metadata = (!load.title.is_empty()).then(|| Metadata {
        metadata_type: 0,
        title: &load.title,
        images: if is_http_url(&load.artwork) {
            vec![load.artwork.as_str()]
        } else {
            Vec::new()
        },
    });

    render(&Message::Load {
        media: Media {
            metadata,
            content_id: format!("http://{}/stream", SocketAddr::new(local_ip, load.port)),
            stream_type: "LIVE",
            content_type: &load.mime,
        },
        autoplay: false,
        request_id,
    })
}

/// Validates the session id only; `request_id` is not consumed by this.
pub(crate) fn check_session(media_session_id: &str) -> Result<(), CastError> {
    SessionRef::parse(media_session_id).map(|_| ())
}

pub fn media_play(request_id: u32, media_session_id: &str) -> Result<String, CastError> {
    render(&Message::Play {
        media_session_id: SessionRef::parse(media_session_id)?,
        request_id,
    })
}

pub fn media_pause(request_id: u32, media_session_id: &str) -> Result<String, CastError> {
    render(&Message::Pause {
        media_session_id: SessionRef::parse(media_session_id)?,
        request_id,
    })
}

pub fn media_stop(request_id: u32, media_session_id: &str) -> Result<String, CastError> {
    render(&Message::Stop {
        media_session_id: SessionRef::parse(media_session_id)?,
        request_id,
    })
}

/// `true` if `level` is something SET_VOLUME may carry.
pub fn volume_in_range(level: f32) -> bool {
    (0.0..=1.0).contains(&level)
}

/// SET_VOLUME, or `None` when `level` is outside `[0, 1]`.
pub fn media_set_volume(
    request_id: u32,
    media_session_id: &str,
    level: f32,
    muted: bool,
) -> Result<Option<String>, CastError> {
    let media_session_id = SessionRef::parse(media_session_id)?;
    if !volume_in_range(level) {
        return Ok(None);
    }
    render(&Message::SetVolume {
        volume: Volume { level, muted },
        media_session_id,
        request_id,
    })
    .map(Some)
}

/// SEEK to `current_time` seconds.
pub fn media_seek(
    request_id: u32,
    media_session_id: &str,
    current_time: f64,
) -> Result<String, CastError> {
    let media_session_id = SessionRef::parse(media_session_id)?;
    check_seek_time(current_time)?;
    render(&Message::Seek {
        current_time,
        media_session_id,
        request_id,
    })
}

pub(crate) fn check_seek_time(current_time: f64) -> Result<(), CastError> {
    if !current_time.is_finite() || current_time < 0.0 {
        return Err(CastError::InvalidParameter("seek position"));
    }
    Ok(())
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn load(title: &str, artwork: &str) -> LoadRequest {
        LoadRequest {
            port: 8010,
            title: title.into(),
            artwork: artwork.into(),
            mime: "video/mp4".into(),
        }
    }

    #[test]
    fn bare_messages() {
        assert_eq!(connect().unwrap(), r#"{"type":"CONNECT"}"#);
        assert_eq!(close().unwrap(), r#"{"type":"CLOSE"}"#);
        assert_eq!(ping().unwrap(), r#"{"type":"PING"}"#);
        assert_eq!(pong().unwrap(), r#"{"type":"PONG"}"#);
    }

    #[test]
    fn receiver_messages() {
        assert_eq!(
            receiver_get_status(3).unwrap(),
            r#"{"type":"GET_STATUS","requestId":3}"#
        );
        assert_eq!(
            receiver_launch(0).unwrap(),
            r#"{"type":"LAUNCH","appId":"CC1AD845","requestId":0}"#
        );
    }

    #[test]
    fn load_without_title_has_no_metadata() {
        let json = media_load(7, "10.0.0.5".parse().unwrap(), &load("", "http://x/a.png")).unwrap();
        assert_eq!(
            json,
            r#"{"type":"LOAD","media":{"contentId":"http://10.0.0.5:8010/stream","streamType":"LIVE","contentType":"video/mp4"},"autoplay":false,"requestId":7}"#
        );
    }

    #[test]
    fn load_with_title_and_http_artwork() {
        let json = media_load(
            1,
            "10.0.0.5".parse().unwrap(),
            &load("Movie", "https://img.example/a.png"),
        )
        .unwrap();
        assert!(json.contains(
            r#""metadata":{"metadataType":0,"title":"Movie","images":["https://img.example/a.png"]}"#
        ));
        assert!(json.find("metadata").unwrap() < json.find("contentId").unwrap());
    }

    #[test]
    fn non_http_artwork_is_omitted() {
        let json = media_load(1, "10.0.0.5".parse().unwrap(), &load("Movie", "file:///a.png")).unwrap();
        assert!(json.contains(r#""metadata":{"metadataType":0,"title":"Movie"}"#));
        assert!(!json.contains("images"));
    }

    #[test]
    fn title_is_escaped() {
        let json = media_load(1, "10.0.0.5".parse().unwrap(), &load("say \"hi\"", "")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["media"]["metadata"]["title"], "say \"hi\"");
    }

    #[test]
    fn ipv6_content_id_is_bracketed() {
        let json = media_load(0, IpAddr::V6(Ipv6Addr::LOCALHOST), &load("", "")).unwrap();
        assert!(json.contains(r#""contentId":"http://[::1]:8010/stream""#));
    }

    #[test]
    fn transport_commands() {
        assert_eq!(
            media_play(4, "12").unwrap(),
            r#"{"type":"PLAY","mediaSessionId":12,"requestId":4}"#
        );
        assert_eq!(
            media_pause(5, "12").unwrap(),
            r#"{"type":"PAUSE","mediaSessionId":12,"requestId":5}"#
        );
        assert_eq!(
            media_stop(6, "abc").unwrap(),
            r#"{"type":"STOP","mediaSessionId":"abc","requestId":6}"#
        );
    }

    #[test]
    fn empty_session_is_rejected() {
        assert!(matches!(
            media_play(0, ""),
            Err(CastError::InvalidParameter(_))
        ));
        assert!(media_set_volume(0, "", 0.5, false).is_err());
        assert!(media_seek(0, "", 1.0).is_err());
    }

    #[test]
    fn set_volume_in_range() {
        let json = media_set_volume(2, "1", 0.5, true).unwrap().unwrap();
        assert_eq!(
            json,
            r#"{"type":"SET_VOLUME","volume":{"level":0.5,"muted":true},"mediaSessionId":1,"requestId":2}"#
        );
        assert!(media_set_volume(2, "1", 0.0, false).unwrap().is_some());
        assert!(media_set_volume(2, "1", 1.0, false).unwrap().is_some());
    }

    #[test]
    fn set_volume_out_of_range_is_none() {
        assert_eq!(media_set_volume(2, "1", 1.5, false).unwrap(), None);
        assert_eq!(media_set_volume(2, "1", -0.1, false).unwrap(), None);
        assert_eq!(media_set_volume(2, "1", f32::NAN, false).unwrap(), None);
    }

    #[test]
    fn seek_field_order() {
        assert_eq!(
            media_seek(9, "3", 12.5).unwrap(),
            r#"{"type":"SEEK","currentTime":12.5,"mediaSessionId":3,"requestId":9}"#
        );
        assert!(media_seek(9, "3", f64::NAN).is_err());
    }

    #[test]
    fn auth_challenge_bytes() {
        assert_eq!(auth_challenge(), vec![0x0A, 0x00]);
    }

    #[test]
    fn command_channels() {
        assert_eq!(Command::Launch.namespace(), Namespace::Receiver);
        assert_eq!(Command::Seek.namespace(), Namespace::Media);
        assert_eq!(Command::MediaGetStatus.to_string(), "GET_STATUS");
    }
}
