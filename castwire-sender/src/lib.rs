//! # castwire-sender
//!
//! Connects to a receiver, launches the default media receiver app and
//! points it at a stream served by this host. Runs on a single task
//! until Ctrl-C, the receiver closing the connection, or a liveness
//! failure.

pub mod config;
pub mod driver;
pub mod error;
pub mod phase;

pub use config::SenderConfig;
pub use driver::Sender;
pub use error::SenderError;
pub use phase::SenderPhase;
