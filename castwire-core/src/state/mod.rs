//! Per-connection state machines.
//!
//! Each piece is driven by [`CastSession`](crate::CastSession) but has
//! no I/O of its own, so it can be tested byte by byte.

mod keepalive;
mod reassembly;
mod requests;
mod sequencer;

pub use keepalive::{KeepaliveAction, KeepaliveMonitor, KeepalivePhase};
pub use reassembly::{Progress, ReassemblyState, ReceiveReassembler};
pub use requests::{RequestKey, RequestTracker, TrackedRequest};
pub use sequencer::RequestSequencer;
