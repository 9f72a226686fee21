use castwire_core::{CastError, Command};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenderError {
    #[error(transparent)]
    Cast(#[from] CastError),

    /// A lifecycle transition was attempted from the wrong phase.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The receiver answered a command with a failure.
    #[error("receiver rejected {command}: {reason}")]
    Rejected { command: Command, reason: String },

    /// A command the session depends on got no answer.
    #[error("{0} timed out")]
    Timeout(Command),

    #[error("no receiver host configured")]
    NoHost,
}
