//! JSON control payloads.
//!
//! [`control`] builds what the sender writes; [`inbound`] decodes what
//! the device sends back.

pub mod control;
pub mod inbound;

pub use control::{Command, LoadRequest};
pub use inbound::{Application, Inbound, MediaStatusEntry, ReceiverStatus, ReceiverVolume};
