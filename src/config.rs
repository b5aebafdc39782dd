//! Session configuration
//!
//! Bounds every session's outgoing queue and picks what happens when a
//! slow receiver lets it fill up.

use clap::ValueEnum;

/// Default outgoing queue capacity per session
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// What to do with a message for a receiver whose queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the new message for that receiver only
    DropNewest,
    /// Discard the new message and close the slow session
    #[default]
    Disconnect,
}

/// Per-session settings shared by every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl SessionConfig {
    pub fn new(queue_capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            // mpsc channels panic on zero capacity
            queue_capacity: queue_capacity.max(1),
            overflow,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, OverflowPolicy::default())
    }
}
