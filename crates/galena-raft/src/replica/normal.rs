//! Leadership maintenance and write propagation handlers.
//!
//! - Heartbeat receipt (any role): defer to the sender, reset the election
//!   timer
//! - Heartbeat interval (leader): re-broadcast liveness
//! - `keys` receipt (non-leader): apply the propagated write directly

use std::time::Instant;

use rand::Rng;

use galena_types::{ReplicaId, Term};
use galena_wire::Body;

use super::state::Role;
use super::{ReplicaOutput, ReplicaState, msg_broadcast};

impl ReplicaState {
    // ========================================================================
    // Heartbeat Handler
    // ========================================================================

    /// Handles a heartbeat from a leader.
    ///
    /// A heartbeat at the current or a newer term unconditionally resets
    /// the election timer and records the sender's leadership, demoting a
    /// Candidate (or a deposed same-term Leader claimant) to Follower. A
    /// stale-term heartbeat is ignored; the sender will step down when a
    /// current-term message reaches it.
    pub(crate) fn on_heartbeat(
        mut self,
        from: ReplicaId,
        term: Term,
        leader: ReplicaId,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        if term < self.term {
            tracing::debug!(
                replica = %self.replica_id,
                from = %from,
                msg_term = %term,
                our_term = %self.term,
                "ignoring heartbeat from stale term"
            );
            return (self, ReplicaOutput::empty());
        }

        if term > self.term {
            self = self.step_down(term, now, rng);
        }

        if self.role != Role::Follower {
            tracing::info!(
                replica = %self.replica_id,
                leader = %leader,
                term = %self.term,
                "deferring to elected leader"
            );
            self.role = Role::Follower;
            self.votes.clear();
            self.heartbeat_timer.cancel();
            self.propagation.clear();
        }

        self.leader = leader;
        self.election_timer.reset(now, rng);
        (self, ReplicaOutput::empty())
    }

    // ========================================================================
    // Heartbeat Interval (Leader)
    // ========================================================================

    /// Re-broadcasts leadership on the fixed heartbeat interval.
    pub(crate) fn on_heartbeat_timeout(mut self, now: Instant) -> (Self, ReplicaOutput) {
        if self.role != Role::Leader {
            // Stale deadline from a demoted leader.
            self.heartbeat_timer.cancel();
            return (self, ReplicaOutput::empty());
        }

        self.heartbeat_timer.arm(now);
        let heartbeat = msg_broadcast(
            self.replica_id.clone(),
            Body::Heartbeat {
                term: self.term,
                leader: self.replica_id.clone(),
            },
        );
        (self, ReplicaOutput::with_messages(vec![heartbeat]))
    }

    // ========================================================================
    // Keys Handler (Follower)
    // ========================================================================

    /// Applies a propagated write to the local store.
    ///
    /// Accepted in any non-leader role; re-application of the same pair is
    /// idempotent. A leader ignores `keys` — it is the only writer for its
    /// own term, and a propagation from a deposed leader must not clobber
    /// current writes.
    pub(crate) fn on_keys(
        mut self,
        from: ReplicaId,
        key: String,
        value: String,
    ) -> (Self, ReplicaOutput) {
        if self.role == Role::Leader {
            tracing::debug!(
                replica = %self.replica_id,
                from = %from,
                key = %key,
                "leader ignoring propagated write"
            );
            return (self, ReplicaOutput::empty());
        }

        tracing::debug!(
            replica = %self.replica_id,
            from = %from,
            key = %key,
            "applying propagated write"
        );
        self.store.apply(key, value);
        (self, ReplicaOutput::empty())
    }
}
