//! Error types for the relay
//!
//! Defines framing errors, per-session errors, room errors and the
//! top-level application error used by the binaries.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::session::SessionState;
use crate::types::ParticipantId;

/// Wire framing errors
///
/// Produced by the pure codec functions in [`crate::message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Body length exceeds the protocol maximum
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Header field is not a valid length
    #[error("invalid header: {0:?}")]
    InvalidHeader(String),

    /// Declared length does not match the delimiter-bounded chunk
    #[error("framing mismatch: header declares {declared} bytes, chunk carries {actual}")]
    FramingMismatch { declared: usize, actual: usize },
}

/// Errors that end a session
///
/// Every variant is handled inside the owning session and converted into
/// an immediate shutdown. None of them reach the server loop.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed frame from the peer
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Read or write failure on the connection
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Peer closed the stream
    #[error("peer disconnected")]
    Disconnected,

    /// Outgoing queue overflowed under the disconnect policy
    #[error("outgoing queue overflowed")]
    QueueOverflow,

    /// Server is shutting down
    #[error("server shutting down")]
    Shutdown,

    /// Operation called from a state that does not allow it
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Registration with the room failed
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Room membership errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The participant is already registered
    #[error("participant {0} already joined")]
    AlreadyJoined(ParticipantId),

    /// The room has been shut down
    #[error("room is closed")]
    Closed,
}

/// Application-level errors
///
/// Returned by the server and client entry points.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session ended with an error
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Frame could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
