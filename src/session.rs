//! Session state machine
//!
//! One `Session` per connection: `Connecting -> Joined -> Closing -> Closed`.
//! This type holds the lifecycle rules only; [`crate::handler`] drives it
//! from the connection's reads and writes.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::message::{self, Message};
use crate::peer::{Mailbox, Peer};
use crate::room::{Delivery, Room};
use crate::types::ParticipantId;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet in the room
    Connecting,
    /// Registered with the room and reading
    Joined,
    /// Asked to close, teardown pending
    Closing,
    /// Terminal
    Closed,
}

/// Per-connection session
#[derive(Debug)]
pub struct Session {
    id: ParticipantId,
    room: Arc<Room>,
    config: SessionConfig,
    state: SessionState,
    /// Present while registered with the room
    peer: Option<Arc<Peer>>,
}

impl Session {
    pub fn new(room: Arc<Room>, config: SessionConfig) -> Self {
        Self {
            id: ParticipantId::new(),
            room,
            config,
            state: SessionState::Connecting,
            peer: None,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Join the room and become a broadcast target
    ///
    /// Valid only from `Connecting`. Returns the mailbox the writer drains.
    pub fn start(&mut self) -> Result<Mailbox, SessionError> {
        self.expect_state("start", SessionState::Connecting)?;

        let (peer, mailbox) = Peer::new(self.id, self.config);
        let peer = Arc::new(peer);
        self.room.join(peer.clone())?;
        self.peer = Some(peer);
        self.state = SessionState::Joined;

        info!("Session {} joined, {} in room", self.id, self.room.len());
        Ok(mailbox)
    }

    /// Handle one delimiter-bounded chunk read from the connection
    ///
    /// A valid frame is forwarded to the room. A decode failure tears the
    /// session down and is returned to the caller.
    pub fn on_read_complete(&mut self, chunk: &[u8]) -> Result<(), SessionError> {
        self.expect_state("read", SessionState::Joined)?;

        match message::decode_frame(chunk) {
            Ok(message) => {
                self.room.deliver(self.id, &message);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(e);
                self.on_error(&err);
                Err(err)
            }
        }
    }

    /// Queue a message on this session's own connection
    pub fn enqueue(&self, message: Message) -> Delivery {
        match &self.peer {
            Some(peer) => peer.enqueue(message),
            None => Delivery::Closed,
        }
    }

    /// Mark the session as closing; teardown follows with `on_error`
    pub fn begin_close(&mut self) {
        if self.state == SessionState::Joined {
            debug!("Session {} closing", self.id);
            self.state = SessionState::Closing;
        }
    }

    /// Tear the session down
    ///
    /// Leaves the room, drops the outgoing queue and moves to `Closed`.
    /// Idempotent: returns false if the session was already closed.
    pub fn on_error(&mut self, cause: &SessionError) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }

        if self.peer.take().is_some() {
            self.room.leave(self.id);
        }
        self.state = SessionState::Closed;

        match cause {
            SessionError::Disconnected | SessionError::Shutdown => {
                info!("Session {} closed: {}", self.id, cause);
            }
            _ => info!("Session {} closed with error: {}", self.id, cause),
        }
        true
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: SessionState,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
