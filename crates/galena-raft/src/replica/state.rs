//! Replica state structure and event dispatch.

use std::collections::HashSet;
use std::time::Instant;

use rand::Rng;

use galena_types::{ReplicaId, Term};
use galena_wire::{Body, Message};

use crate::config::{ClusterConfig, TimingConfig};
use crate::replication::Propagation;
use crate::store::KeyStore;
use crate::timer::{ElectionTimer, HeartbeatTimer};

use super::{ReplicaEvent, ReplicaOutput, TimeoutKind, msg_broadcast};

// ============================================================================
// Role
// ============================================================================

/// The role a replica currently plays in the election protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Default role; applies propagated writes, votes, redirects clients.
    Follower,
    /// Running an election it started for its current term.
    Candidate,
    /// Won a majority for its current term; serves client traffic.
    Leader,
}

// ============================================================================
// Replica State
// ============================================================================

/// The state of a Galena replica.
///
/// All mutable protocol state lives here and is owned by a single actor;
/// every transition goes through [`ReplicaState::on_event`].
///
/// # State Categories
///
/// 1. **Identity**: `replica_id`, `config`
/// 2. **Election**: `term`, `role`, `voted_for`, `votes`, `leader`
/// 3. **Timers**: `election_timer`, `heartbeat_timer`
/// 4. **Data**: `store`, `propagation`
#[derive(Debug, Clone)]
pub struct ReplicaState {
    // ========================================================================
    // Identity
    // ========================================================================
    /// This replica's id.
    pub(crate) replica_id: ReplicaId,

    /// Cluster membership.
    pub(crate) config: ClusterConfig,

    // ========================================================================
    // Election State
    // ========================================================================
    /// Current term. Never decreases.
    pub(crate) term: Term,

    /// Current role.
    pub(crate) role: Role,

    /// Who this replica voted for in the current term.
    ///
    /// Cleared exactly when `term` strictly increases; at most one vote is
    /// ever granted per term.
    pub(crate) voted_for: Option<ReplicaId>,

    /// Votes received while Candidate, self included.
    ///
    /// A set rather than a counter so a duplicated `vote_response` cannot
    /// be double-counted.
    pub(crate) votes: HashSet<ReplicaId>,

    /// Best-known leader; the broadcast sentinel when unknown.
    pub(crate) leader: ReplicaId,

    // ========================================================================
    // Timers
    // ========================================================================
    /// Randomized election deadline; armed in every role except Leader.
    pub(crate) election_timer: ElectionTimer,

    /// Fixed-interval heartbeat deadline; armed only while Leader.
    pub(crate) heartbeat_timer: HeartbeatTimer,

    // ========================================================================
    // Data
    // ========================================================================
    /// The key-value map.
    pub(crate) store: KeyStore,

    /// Leader-side write fan-out bookkeeping.
    pub(crate) propagation: Propagation,
}

impl ReplicaState {
    /// Creates a replica in the Follower role and produces its startup
    /// output: the `hello` broadcast, with the election timer armed.
    ///
    /// # Panics
    ///
    /// Panics if `replica_id` is not a member of `config`.
    pub fn new(
        replica_id: ReplicaId,
        config: ClusterConfig,
        timing: &TimingConfig,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        assert!(
            config.contains(&replica_id),
            "replica {replica_id} is not in the cluster config"
        );

        let mut election_timer = ElectionTimer::new(timing);
        election_timer.reset(now, rng);

        let state = Self {
            replica_id: replica_id.clone(),
            config,
            term: Term::ZERO,
            role: Role::Follower,
            voted_for: None,
            votes: HashSet::new(),
            leader: ReplicaId::broadcast(),
            election_timer,
            heartbeat_timer: HeartbeatTimer::new(timing),
            store: KeyStore::new(),
            propagation: Propagation::new(),
        };

        tracing::info!(replica = %state.replica_id, "replica starting");

        let hello = msg_broadcast(
            replica_id,
            Body::Hello {
                leader: ReplicaId::broadcast(),
            },
        );
        (state, ReplicaOutput::with_messages(vec![hello]))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica_id
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    /// Best-known leader; the broadcast sentinel when unknown.
    pub fn leader(&self) -> &ReplicaId {
        &self.leader
    }

    pub fn voted_for(&self) -> Option<&ReplicaId> {
        self.voted_for.as_ref()
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn propagation(&self) -> &Propagation {
        &self.propagation
    }

    // ========================================================================
    // Timer Surface (for the runtime's poll loop)
    // ========================================================================

    /// Returns the earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.election_timer.deadline(), self.heartbeat_timer.deadline()) {
            (Some(e), Some(h)) => Some(e.min(h)),
            (Some(e), None) => Some(e),
            (None, Some(h)) => Some(h),
            (None, None) => None,
        }
    }

    /// Returns the timeout that is due at `now`, if any.
    ///
    /// Each due timeout must be fed back through [`on_event`] before asking
    /// again; handling a timeout re-arms or cancels its timer, so this
    /// cannot report the same deadline twice.
    ///
    /// [`on_event`]: ReplicaState::on_event
    pub fn due(&self, now: Instant) -> Option<TimeoutKind> {
        if self.election_timer.is_expired(now) {
            Some(TimeoutKind::Election)
        } else if self.heartbeat_timer.is_expired(now) {
            Some(TimeoutKind::Heartbeat)
        } else {
            None
        }
    }

    // ========================================================================
    // Event Dispatch (the request router)
    // ========================================================================

    /// Processes one event and returns the new state plus outgoing messages.
    ///
    /// Dispatch is role-aware: election and heartbeat traffic is handled in
    /// every role, client traffic only while Leader (otherwise redirected),
    /// and propagated writes only while not Leader. Recognized but
    /// unexpected bodies are dropped, resetting the election timer as
    /// conservative liveness evidence.
    pub fn on_event(
        self,
        event: ReplicaEvent,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        match event {
            ReplicaEvent::Timeout(TimeoutKind::Election) => self.on_election_timeout(now, rng),
            ReplicaEvent::Timeout(TimeoutKind::Heartbeat) => self.on_heartbeat_timeout(now),
            ReplicaEvent::Message(msg) => self.on_message(msg, now, rng),
        }
    }

    fn on_message(
        mut self,
        msg: Message,
        now: Instant,
        rng: &mut impl Rng,
    ) -> (Self, ReplicaOutput) {
        let src = msg.src;
        match msg.body {
            Body::RequestVote {
                term, candidate_id, ..
            } => self.on_request_vote(src, term, candidate_id, now, rng),
            Body::VoteResponse { term, vote_granted } => {
                self.on_vote_response(src, term, vote_granted, now, rng)
            }
            Body::Heartbeat { term, leader } => self.on_heartbeat(src, term, leader, now, rng),
            Body::Get { key, mid } => self.on_get(src, key, mid),
            Body::Put { key, value, mid } => self.on_put(src, key, value, mid),
            Body::Keys { key, value } => self.on_keys(src, key, value),
            Body::Hello { .. } | Body::Ok { .. } | Body::Fail { .. } | Body::Redirect { .. } => {
                // Not meaningful to a replica, but evidence the cluster is
                // alive; stay a follower a little longer.
                if self.role != Role::Leader {
                    self.election_timer.reset(now, rng);
                }
                (self, ReplicaOutput::empty())
            }
        }
    }

    // ========================================================================
    // Shared Transitions
    // ========================================================================

    /// Adopts a strictly higher term and demotes to Follower.
    ///
    /// This is the only place `term` changes other than starting an
    /// election, and the only place `voted_for` is cleared.
    pub(crate) fn step_down(mut self, term: Term, now: Instant, rng: &mut impl Rng) -> Self {
        debug_assert!(term > self.term, "step_down requires a strictly higher term");

        tracing::info!(
            replica = %self.replica_id,
            old_term = %self.term,
            new_term = %term,
            role = ?self.role,
            "observed higher term, stepping down to follower"
        );

        self.term = term;
        self.voted_for = None;
        self.votes.clear();
        self.role = Role::Follower;
        // The leader of the old term is stale by definition.
        self.leader = ReplicaId::broadcast();
        self.heartbeat_timer.cancel();
        self.propagation.clear();
        self.election_timer.reset(now, rng);
        self
    }
}
