//! Client request handlers.
//!
//! `get` and `put` are served only by a replica that currently believes
//! itself Leader. Everyone else steers the client: `redirect` when a leader
//! is known, `fail` when it is not (the client retries after a backoff).

use galena_types::{Mid, ReplicaId};
use galena_wire::Body;

use super::state::Role;
use super::{ReplicaOutput, ReplicaState, msg_broadcast, msg_to};

impl ReplicaState {
    // ========================================================================
    // Get Handler (Leader)
    // ========================================================================

    /// Reads a key from the leader's store.
    ///
    /// An absent key answers `ok` with an empty value rather than a failure
    /// — a deliberately weak contract carried over from the wire schema, so
    /// callers cannot distinguish "unset" from "set to empty".
    pub(crate) fn on_get(self, from: ReplicaId, key: String, mid: Mid) -> (Self, ReplicaOutput) {
        if self.role != Role::Leader {
            return self.divert_client(from, mid);
        }

        let value = self.store.get(&key).unwrap_or_default().to_string();
        let response = msg_to(
            self.replica_id.clone(),
            from,
            Body::Ok {
                mid,
                value: Some(value),
            },
        );
        (self, ReplicaOutput::with_messages(vec![response]))
    }

    // ========================================================================
    // Put Handler (Leader)
    // ========================================================================

    /// Accepts a write on the leader.
    ///
    /// The write is applied to the local store, fanned out to every peer as
    /// a `keys` message, and acknowledged to the client immediately. The
    /// fan-out is recorded in the propagation tracker; there is no quorum
    /// wait before the `ok`, so the guarantee is "committed on the leader,
    /// best-effort propagated".
    pub(crate) fn on_put(
        mut self,
        from: ReplicaId,
        key: String,
        value: String,
        mid: Mid,
    ) -> (Self, ReplicaOutput) {
        if self.role != Role::Leader {
            return self.divert_client(from, mid);
        }

        self.store.apply(key.clone(), value.clone());

        let followers: Vec<ReplicaId> = self.config.peers(&self.replica_id).cloned().collect();
        self.propagation
            .record(key.clone(), value.clone(), followers);

        tracing::debug!(
            replica = %self.replica_id,
            key = %key,
            outstanding = self.propagation.outstanding(),
            "accepted write, propagating to followers"
        );

        let fanout = msg_broadcast(self.replica_id.clone(), Body::Keys { key, value });
        let response = msg_to(self.replica_id.clone(), from, Body::Ok { mid, value: None });
        (self, ReplicaOutput::with_messages(vec![fanout, response]))
    }

    // ========================================================================
    // Non-Leader Steering
    // ========================================================================

    /// Steers a client away from a non-leader.
    fn divert_client(self, from: ReplicaId, mid: Mid) -> (Self, ReplicaOutput) {
        let body = if self.leader.is_broadcast() {
            tracing::debug!(
                replica = %self.replica_id,
                client = %from,
                "no known leader, failing client request"
            );
            Body::Fail { mid }
        } else {
            tracing::debug!(
                replica = %self.replica_id,
                client = %from,
                leader = %self.leader,
                "redirecting client to leader"
            );
            Body::Redirect {
                leader: self.leader.clone(),
                mid,
            }
        };
        let response = msg_to(self.replica_id.clone(), from, body);
        (self, ReplicaOutput::with_messages(vec![response]))
    }
}
