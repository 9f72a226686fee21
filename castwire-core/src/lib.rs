//! # castwire-core
//!
//! Sender-side core of the CASTV2 protocol spoken by streaming receivers.
//!
//! This crate contains:
//! - **Wire types**: `CastMessage` protobuf envelope, length header, `Frame`
//! - **Codec**: `CastCodec` for `tokio_util` framing and `build_and_send`
//! - **Network**: `Connection` over TLS, `Connector` / `TlsConnector`
//! - **State**: frame reassembly, PING/PONG keepalive, request ids and tracking
//! - **Protocol**: JSON control message builders and inbound message decoding
//! - **Session**: `CastSession`, the single-task driver tying it together
//! - **Error**: `CastError`, a typed `thiserror` hierarchy

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod namespace;
pub mod network;
pub mod protocol;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{CastCodec, build_and_send};
pub use config::{KeepaliveConfig, SessionConfig, TransportConfig};
pub use error::CastError;
pub use frame::{Frame, Payload, PayloadKind};
pub use header::{HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{CastMessage, DeviceAuthMessage};
pub use namespace::{
    DEFAULT_CONTROL_PORT, DEFAULT_RECEIVER_ID, MEDIA_RECEIVER_APP_ID, Namespace, SENDER_ID,
};
pub use network::{Connection, ConnectionInfo, Connector, SecureStream, TlsConnector};
pub use protocol::{Command, Inbound, LoadRequest};
pub use session::{CastSession, InterruptHandle, PollOutcome};
pub use state::{
    KeepaliveAction, KeepaliveMonitor, KeepalivePhase, Progress, ReassemblyState,
    ReceiveReassembler, RequestSequencer, RequestTracker, TrackedRequest,
};
