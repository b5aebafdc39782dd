//! Room definition
//!
//! The single broadcast domain. Tracks live participants and fans each
//! message out to everyone but its sender.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::RoomError;
use crate::message::Message;
use crate::types::ParticipantId;

/// Outcome of handing one message to one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for write
    Queued,
    /// Discarded because the participant's queue was full
    Dropped,
    /// The participant is no longer accepting messages
    Closed,
}

/// Anything the Room can broadcast to
///
/// Implementations must not block and must not call back into the Room.
/// A participant's own send path is not part of this trait: sessions
/// queue their outgoing messages through [`crate::peer::Peer::enqueue`].
pub trait Participant: Send + Sync {
    fn id(&self) -> ParticipantId;

    /// Accept a message broadcast by another participant
    fn deliver(&self, message: &Message) -> Delivery;

    /// Ask the participant to leave (server shutdown)
    fn disconnect(&self);
}

/// Per-call fan-out summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub queued: usize,
    pub dropped: usize,
    pub closed: usize,
}

impl DeliveryReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Queued => self.queued += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Closed => self.closed += 1,
        }
    }

    /// Number of participants the message was offered to
    pub fn targets(&self) -> usize {
        self.queued + self.dropped + self.closed
    }
}

/// Single chat room
///
/// Created once per server and shared by every session through an `Arc`.
/// The participant map is the only shared mutable state; it sits behind a
/// mutex that is never held across an await or a call into a participant.
#[derive(Default)]
pub struct Room {
    members: Mutex<Members>,
}

#[derive(Default)]
struct Members {
    participants: HashMap<ParticipantId, Arc<dyn Participant>>,
    /// Set by `disconnect_all`; no joins after that
    closed: bool,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant
    ///
    /// Returns `AlreadyJoined` and leaves the set unchanged if the id is
    /// present, or `Closed` once the room has been shut down.
    pub fn join(&self, participant: Arc<dyn Participant>) -> Result<(), RoomError> {
        let id = participant.id();
        let mut members = self.lock();
        if members.closed {
            return Err(RoomError::Closed);
        }
        let participants = &mut members.participants;
        if participants.contains_key(&id) {
            return Err(RoomError::AlreadyJoined(id));
        }
        participants.insert(id, participant);
        debug!("Participant {} joined, {} in room", id, participants.len());
        Ok(())
    }

    /// Unregister a participant
    ///
    /// Returns false if it was not present, so repeated leaves are harmless.
    pub fn leave(&self, id: ParticipantId) -> bool {
        let mut members = self.lock();
        let removed = members.participants.remove(&id).is_some();
        if removed {
            debug!("Participant {} left, {} in room", id, members.participants.len());
        }
        removed
    }

    /// Fan `message` out to every participant except `sender`
    ///
    /// The participant set is snapshotted when the call starts. Anyone who
    /// finished `leave` before that is never a target; each target is
    /// offered the message exactly once. Returns once every target has
    /// queued (or refused) it.
    pub fn deliver(&self, sender: ParticipantId, message: &Message) -> DeliveryReport {
        let targets: Vec<Arc<dyn Participant>> = self
            .lock()
            .participants
            .iter()
            .filter(|(id, _)| **id != sender)
            .map(|(_, participant)| Arc::clone(participant))
            .collect();

        let mut report = DeliveryReport::default();
        for participant in targets {
            report.record(participant.deliver(message));
        }

        debug!(
            "Message of {} bytes from {}: queued {}, dropped {}, closed {}",
            message.len(),
            sender,
            report.queued,
            report.dropped,
            report.closed
        );
        report
    }

    /// Close the room and ask every participant to leave
    ///
    /// Later joins fail with `Closed`, so a session that was still starting
    /// cannot slip in after the shutdown signal went out.
    pub fn disconnect_all(&self) {
        let participants: Vec<Arc<dyn Participant>> = {
            let mut members = self.lock();
            members.closed = true;
            members.participants.values().cloned().collect()
        };
        for participant in participants {
            participant.disconnect();
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.lock().participants.contains_key(&id)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.lock().participants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().participants.is_empty()
    }

    // The map is updated by single insert/remove calls, so a panic elsewhere
    // cannot leave it half-modified.
    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("participants", &self.participant_ids())
            .finish()
    }
}
