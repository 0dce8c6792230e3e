//! Replica state machine.
//!
//! The replica is completely pure:
//! - Takes messages and timer expiries as input
//! - Produces new state and outgoing messages as output
//! - No I/O, no clocks, no ambient randomness
//!
//! The runtime owns the socket and the clock; it sleeps until the earliest
//! deadline reported by [`ReplicaState::next_deadline`], then feeds either
//! the decoded datagram or the due [`TimeoutKind`] into
//! [`ReplicaState::on_event`] and sends whatever messages come back.
//!
//! # Key Types
//!
//! - [`ReplicaState`]: the core state machine state
//! - [`ReplicaEvent`]: inputs that can trigger transitions
//! - [`ReplicaOutput`]: messages produced by a transition

mod client;
mod election;
mod normal;
mod state;

pub use state::{ReplicaState, Role};

use galena_types::ReplicaId;
use galena_wire::{Body, Message};

// ============================================================================
// Replica Output
// ============================================================================

/// Output produced by the replica state machine.
///
/// The caller (runtime) is responsible for encoding and sending each
/// message; sends are fire-and-forget and may be dropped by the channel.
#[derive(Debug, Default)]
pub struct ReplicaOutput {
    /// Messages to send.
    pub messages: Vec<Message>,
}

impl ReplicaOutput {
    /// Creates an empty output.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates output carrying the given messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Merges another output into this one, preserving order.
    pub fn merge(&mut self, other: ReplicaOutput) {
        self.messages.extend(other.messages);
    }
}

// ============================================================================
// Replica Event
// ============================================================================

/// Events that can trigger replica state transitions.
#[derive(Debug, Clone)]
pub enum ReplicaEvent {
    /// A message arrived from the bus (peer or client).
    Message(Message),

    /// A timer fired.
    Timeout(TimeoutKind),
}

/// Types of timeouts that can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No qualifying message arrived in time; start an election.
    Election,

    /// The leader's heartbeat interval elapsed; re-broadcast.
    Heartbeat,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Creates a message from this replica to a specific endpoint.
pub(crate) fn msg_to(from: ReplicaId, to: ReplicaId, body: Body) -> Message {
    Message::to(from, to, body)
}

/// Creates a broadcast message from this replica.
pub(crate) fn msg_broadcast(from: ReplicaId, body: Body) -> Message {
    Message::broadcast(from, body)
}
