//! Domain-specific error types for the castwire protocol core.
//!
//! All fallible operations return `Result<T, CastError>`.
//! Peer input never panics. Every error is typed, and
//! [`CastError::is_recoverable`] tells the caller whether the session
//! can keep polling afterwards.

use thiserror::Error;

/// The canonical error type for the castwire protocol core.
#[derive(Debug, Error)]
pub enum CastError {
    // ── Connection Errors ────────────────────────────────────────
    /// TCP connect or local address lookup failed.
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS context creation or the handshake failed.
    #[error("TLS session setup failed: {0}")]
    Tls(String),

    /// An operation needed a connection that was already torn down.
    #[error("not connected")]
    NotConnected,

    // ── Transport Errors ─────────────────────────────────────────
    /// The secure stream reported an I/O error.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream (a read returned zero bytes).
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Fewer bytes were written than the frame occupies.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    // ── Framing Errors ───────────────────────────────────────────
    /// A frame declared (or produced) a payload above the limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The frame body is not a valid `CastMessage`.
    #[error("malformed frame: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value}")]
    UnknownVariant { type_name: &'static str, value: i64 },

    /// The peer used a protocol version other than CASTV2_1_0.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(i32),

    // ── Liveness ─────────────────────────────────────────────────
    /// No traffic and no PONG within the retry budget.
    #[error("receiver did not answer PING after {retries} retries")]
    PeerUnresponsive { retries: u32 },

    // ── Serialization Errors ─────────────────────────────────────
    /// Building an outgoing frame failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A JSON payload could not be produced or parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Caller Errors ────────────────────────────────────────────
    /// A command was issued with an argument that breaks its contract.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

impl CastError {
    /// Returns `true` if the session stays usable after this error.
    ///
    /// Dropped frames, undecodable payloads and rejected parameters
    /// leave the connection intact; everything else means the caller
    /// should tear the session down and reconnect.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CastError::FrameTooLarge { .. }
                | CastError::Decode(_)
                | CastError::UnknownVariant { .. }
                | CastError::UnsupportedVersion(_)
                | CastError::Json(_)
                | CastError::InvalidParameter(_)
        )
    }
}

impl From<prost::EncodeError> for CastError {
    fn from(e: prost::EncodeError) -> Self {
        CastError::Encoding(e.to_string())
    }
}

impl From<rustls::Error> for CastError {
    fn from(e: rustls::Error) -> Self {
        CastError::Tls(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CastError::FrameTooLarge {
            size: 20000,
            max: 10236,
        };
        assert!(e.to_string().contains("20000"));
        assert!(e.to_string().contains("10236"));

        let e = CastError::PeerUnresponsive { retries: 2 };
        assert!(e.to_string().contains("PING"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: CastError = io_err.into();
        assert!(matches!(e, CastError::Io(_)));
        assert!(!e.is_recoverable());
    }

    #[test]
    fn framing_errors_are_recoverable() {
        assert!(CastError::FrameTooLarge { size: 1, max: 0 }.is_recoverable());
        assert!(CastError::InvalidParameter("empty").is_recoverable());
        assert!(!CastError::ConnectionClosed.is_recoverable());
        assert!(!CastError::PeerUnresponsive { retries: 2 }.is_recoverable());
    }
}
