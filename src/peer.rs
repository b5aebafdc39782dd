//! Room-facing half of a session
//!
//! A `Peer` is what the Room holds for a session: the sending end of its
//! bounded outgoing queue plus a close signal. The session's writer owns
//! the matching [`Mailbox`].

use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::config::{OverflowPolicy, SessionConfig};
use crate::message::Message;
use crate::room::{Delivery, Participant};
use crate::types::ParticipantId;

/// Why a session was asked to close from outside its own read loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Outgoing queue overflowed under [`OverflowPolicy::Disconnect`]
    Overflow,
    /// Server is shutting down
    Shutdown,
}

/// Sending side of one session's outgoing queue
#[derive(Debug)]
pub struct Peer {
    id: ParticipantId,
    sender: mpsc::Sender<Message>,
    overflow: OverflowPolicy,
    close: watch::Sender<Option<CloseReason>>,
}

/// Receiving side, owned by the session's I/O task
#[derive(Debug)]
pub struct Mailbox {
    /// Outgoing messages in enqueue order
    pub outgoing: mpsc::Receiver<Message>,
    /// Set once when someone asks the session to close
    pub close: watch::Receiver<Option<CloseReason>>,
}

impl Peer {
    pub fn new(id: ParticipantId, config: SessionConfig) -> (Self, Mailbox) {
        let (sender, outgoing) = mpsc::channel(config.queue_capacity.max(1));
        let (close, close_rx) = watch::channel(None);
        let peer = Self {
            id,
            sender,
            overflow: config.overflow,
            close,
        };
        (
            peer,
            Mailbox {
                outgoing,
                close: close_rx,
            },
        )
    }

    /// Append a message to the outgoing queue without waiting
    ///
    /// The writer drains the queue one message at a time, so messages go
    /// out in the order they were enqueued.
    pub fn enqueue(&self, message: Message) -> Delivery {
        match self.sender.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                match self.overflow {
                    OverflowPolicy::DropNewest => {
                        warn!("Outgoing queue full for {}, dropping message", self.id);
                    }
                    OverflowPolicy::Disconnect => {
                        warn!("Outgoing queue full for {}, disconnecting", self.id);
                        self.request_close(CloseReason::Overflow);
                    }
                }
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Signal the session to close; the first reason wins
    pub fn request_close(&self, reason: CloseReason) {
        self.close.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }
}

impl Participant for Peer {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn deliver(&self, message: &Message) -> Delivery {
        self.enqueue(message.clone())
    }

    fn disconnect(&self) {
        self.request_close(CloseReason::Shutdown);
    }
}
