//! Leader election protocol handlers.
//!
//! 1. **Election timeout**: a Follower (or a Candidate whose election
//!    stalled) increments its term, votes for itself, and broadcasts
//!    `request_vote`
//! 2. **`request_vote`**: peers grant at most one vote per term
//! 3. **`vote_response`**: the candidate counts grants and takes leadership
//!    on a strict majority
//!
//! # Safety Properties
//!
//! - At most one leader per term: a majority of single votes cannot be
//!   split across two candidates in the same term
//! - `term` never decreases; `voted_for` is cleared exactly when it
//!   strictly increases

use std::time::Instant;

use rand::Rng;

use galena_types::{ReplicaId, Term};
use galena_wire::Body;

use super::state::Role;
use super::{ReplicaOutput, ReplicaState, msg_broadcast, msg_to};

impl ReplicaState {
    // ========================================================================
    // Election Timeout
    // ========================================================================

    /// Starts an election: become Candidate for the next term and solicit
    /// votes from every peer.
    ///
    /// Also fires while already Candidate when an election stalls (split
    /// vote or lost messages); the candidate then re-runs with a fresh term
    /// and a fresh randomized deadline.
    pub(crate) fn on_election_timeout(
        mut self,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        if self.role == Role::Leader {
            // Stale deadline from before this replica took leadership.
            self.election_timer.cancel();
            return (self, ReplicaOutput::empty());
        }

        self.term = self.term.next();
        self.role = Role::Candidate;
        self.voted_for = Some(self.replica_id.clone());
        self.votes.clear();
        self.votes.insert(self.replica_id.clone());
        self.leader = ReplicaId::broadcast();
        self.election_timer.reset(now, rng);

        tracing::info!(
            replica = %self.replica_id,
            term = %self.term,
            "election timeout, becoming candidate"
        );

        // A single-replica cluster is its own majority.
        if self.votes.len() >= self.config.quorum_size() {
            return self.become_leader(now);
        }

        let request = msg_broadcast(
            self.replica_id.clone(),
            Body::request_vote(self.term, self.replica_id.clone()),
        );
        (self, ReplicaOutput::with_messages(vec![request]))
    }

    // ========================================================================
    // RequestVote Handler
    // ========================================================================

    /// Handles a vote request, in any role.
    ///
    /// Grants iff the candidate's term is current-or-newer and this replica
    /// has not already voted for someone else this term. A response is
    /// always sent, carrying the (possibly just-updated) local term.
    pub(crate) fn on_request_vote(
        mut self,
        from: ReplicaId,
        term: Term,
        candidate_id: ReplicaId,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        if term < self.term {
            tracing::debug!(
                replica = %self.replica_id,
                candidate = %candidate_id,
                msg_term = %term,
                our_term = %self.term,
                "denying vote request from stale term"
            );
            let deny = msg_to(
                self.replica_id.clone(),
                from,
                Body::VoteResponse {
                    term: self.term,
                    vote_granted: false,
                },
            );
            return (self, ReplicaOutput::with_messages(vec![deny]));
        }

        if term > self.term {
            self = self.step_down(term, now, rng);
        }

        let granted = match &self.voted_for {
            None => true,
            Some(voted) => *voted == candidate_id,
        };

        if granted {
            self.voted_for = Some(candidate_id.clone());
            // A granted vote is a qualifying liveness signal.
            self.election_timer.reset(now, rng);
            tracing::info!(
                replica = %self.replica_id,
                candidate = %candidate_id,
                term = %self.term,
                "granting vote"
            );
        } else {
            tracing::debug!(
                replica = %self.replica_id,
                candidate = %candidate_id,
                voted_for = ?self.voted_for,
                term = %self.term,
                "denying vote, already voted this term"
            );
        }

        let response = msg_to(
            self.replica_id.clone(),
            from,
            Body::VoteResponse {
                term: self.term,
                vote_granted: granted,
            },
        );
        (self, ReplicaOutput::with_messages(vec![response]))
    }

    // ========================================================================
    // VoteResponse Handler (Candidate)
    // ========================================================================

    /// Counts a vote response; takes leadership on a strict majority.
    ///
    /// Responses from other terms are ignored: a stale grant must not count
    /// toward the current election, and a newer term demotes us outright.
    pub(crate) fn on_vote_response(
        mut self,
        from: ReplicaId,
        term: Term,
        vote_granted: bool,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        if term > self.term {
            self = self.step_down(term, now, rng);
            return (self, ReplicaOutput::empty());
        }

        if self.role != Role::Candidate || term < self.term || !vote_granted {
            return (self, ReplicaOutput::empty());
        }

        self.votes.insert(from);
        tracing::debug!(
            replica = %self.replica_id,
            term = %self.term,
            votes = self.votes.len(),
            needed = self.config.quorum_size(),
            "vote received"
        );

        if self.votes.len() >= self.config.quorum_size() {
            return self.become_leader(now);
        }
        (self, ReplicaOutput::empty())
    }

    // ========================================================================
    // Leadership
    // ========================================================================

    /// Takes leadership of the current term.
    ///
    /// Announces with an immediate heartbeat; the heartbeat timer then keeps
    /// re-broadcasting so followers' election timers stay reset.
    pub(crate) fn become_leader(mut self, now: Instant) -> (Self, ReplicaOutput) {
        tracing::info!(
            replica = %self.replica_id,
            term = %self.term,
            votes = self.votes.len(),
            "won election, becoming leader"
        );

        self.role = Role::Leader;
        self.leader = self.replica_id.clone();
        self.votes.clear();
        self.election_timer.cancel();
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
}
