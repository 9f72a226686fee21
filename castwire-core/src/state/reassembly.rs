//! Incremental frame reassembly.
//!
//! Bytes arrive in whatever pieces the TLS layer hands out. The
//! reassembler accumulates exactly one frame at a time:
//!
//! ```text
//!  AwaitingHeader ──4 bytes──► AwaitingPayload ──declared bytes──► (frame)
//!        │                                                            │
//!        │  declared > max                                            │
//!        ▼                                                            │
//!    Draining ──declared bytes discarded──► (dropped)                 │
//!        │                                                            │
//!        └──────────────────► AwaitingHeader ◄────────────────────────┘
//! ```
//!
//! [`next_read_len`](ReceiveReassembler::next_read_len) never asks for
//! bytes past the end of the current frame, so a reader that honours it
//! never pulls the next frame's bytes into this one.

use bytes::{Buf, Bytes, BytesMut};
use tracing::error;

use crate::header::{self, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Where the reassembler is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    /// Fewer than [`HEADER_SIZE`] bytes of the frame seen.
    AwaitingHeader,
    /// Header parsed; collecting `declared` body bytes.
    AwaitingPayload { declared: usize },
    /// Header declared more than the maximum; discarding the body.
    Draining { declared: usize, drained: usize },
}

/// Result of feeding bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The current frame is not complete yet.
    NeedMore,
    /// A complete frame body (length prefix stripped).
    Frame(Bytes),
    /// An oversized frame was fully drained and discarded.
    Dropped { declared: usize },
}

pub struct ReceiveReassembler {
    /// Header and body bytes of the in-progress frame.
    buffer: BytesMut,
    state: ReassemblyState,
    max_payload: usize,
}

impl ReceiveReassembler {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(HEADER_SIZE + max_payload),
            state: ReassemblyState::AwaitingHeader,
            max_payload,
        }
    }

    pub fn state(&self) -> ReassemblyState {
        self.state
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Largest single read [`next_read_len`](Self::next_read_len) can ask for.
    pub fn max_read_len(&self) -> usize {
        HEADER_SIZE + self.max_payload
    }

    /// Bytes of the in-progress frame received so far, drained ones included.
    pub fn received(&self) -> usize {
        match self.state {
            ReassemblyState::Draining { drained, .. } => HEADER_SIZE + drained,
            _ => self.buffer.len(),
        }
    }

    /// `true` between frames.
    pub fn is_idle(&self) -> bool {
        self.state == ReassemblyState::AwaitingHeader && self.buffer.is_empty()
    }

    /// How many bytes to read next without crossing the frame boundary.
    pub fn next_read_len(&self) -> usize {
        match self.state {
            ReassemblyState::AwaitingHeader => HEADER_SIZE - self.buffer.len(),
            ReassemblyState::AwaitingPayload { declared } => {
                HEADER_SIZE + declared - self.buffer.len()
            }
            ReassemblyState::Draining { declared, drained } => {
                (declared - drained).min(self.max_payload)
            }
        }
    }

    /// Consume bytes belonging to the current frame.
    ///
    /// Returns how many bytes of `data` were used; anything past the end
    /// of the current frame is left for the next call.
    pub fn feed(&mut self, mut data: &[u8]) -> (usize, Progress) {
        let total = data.len();

        loop {
            let take = self.next_read_len().min(data.len());
            let (chunk, rest) = data.split_at(take);
            data = rest;
            let consumed = total - data.len();

            match self.state {
                ReassemblyState::AwaitingHeader => {
                    self.buffer.extend_from_slice(chunk);
                    let Some(declared) = header::decode_length(&self.buffer) else {
                        return (consumed, Progress::NeedMore);
                    };
                    let declared = declared as usize;

                    if declared > self.max_payload {
                        error!("packet too long ({declared} bytes): dropping its data");
                        self.state = ReassemblyState::Draining {
                            declared,
                            drained: 0,
                        };
                    } else {
                        self.state = ReassemblyState::AwaitingPayload { declared };
                    }
                }

                ReassemblyState::AwaitingPayload { declared } => {
                    self.buffer.extend_from_slice(chunk);
                    if self.buffer.len() < HEADER_SIZE + declared {
                        return (consumed, Progress::NeedMore);
                    }

                    let mut frame = self.buffer.split();
                    frame.advance(HEADER_SIZE);
                    self.state = ReassemblyState::AwaitingHeader;
                    return (consumed, Progress::Frame(frame.freeze()));
                }

                ReassemblyState::Draining { declared, drained } => {
                    let drained = drained + take;
                    if drained < declared {
                        self.state = ReassemblyState::Draining { declared, drained };
                        return (consumed, Progress::NeedMore);
                    }

                    self.buffer.clear();
                    self.state = ReassemblyState::AwaitingHeader;
                    return (consumed, Progress::Dropped { declared });
                }
            }
        }
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ReassemblyState::AwaitingHeader;
    }
}

impl Default for ReceiveReassembler {
    fn default() -> Self {
        Self::new()
    }
}
