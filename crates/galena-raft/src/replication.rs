//! Leader-side write fan-out bookkeeping.

use std::collections::{HashMap, HashSet};

use galena_types::ReplicaId;

/// One outstanding propagated write.
///
/// The wire schema carries no follower acknowledgment for `keys` messages,
/// so `awaiting` records which followers the write was fanned out to rather
/// than which have confirmed it. The client has already been told `ok` by
/// the time this entry exists; the tracker makes the durability gap between
/// "committed on the leader" and "present on every follower" observable
/// instead of silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAck {
    /// The value that was broadcast.
    pub value: String,
    /// The followers the write was sent to.
    pub awaiting: HashSet<ReplicaId>,
}

/// Tracks per-key propagation state on the leader.
///
/// A re-write of the same key replaces the earlier entry (last-write-wins,
/// matching the store). The tracker is leader-only state and is cleared on
/// demotion.
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    pending: HashMap<String, PendingAck>,
}

impl Propagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write fanned out to `followers`.
    pub fn record(
        &mut self,
        key: String,
        value: String,
        followers: impl IntoIterator<Item = ReplicaId>,
    ) {
        self.pending.insert(
            key,
            PendingAck {
                value,
                awaiting: followers.into_iter().collect(),
            },
        );
    }

    /// Returns the propagation entry for `key`, if one is outstanding.
    pub fn pending_for(&self, key: &str) -> Option<&PendingAck> {
        self.pending.get(key)
    }

    /// Returns the number of keys with outstanding propagation.
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Drops all entries. Called when leadership is lost; the new leader
    /// owns propagation from its own term onward.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
