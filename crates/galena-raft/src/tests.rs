//! Integration tests for galena-raft.
//!
//! These exercise whole-protocol scenarios by hand-delivering the messages
//! one replica's output produces into the next replica, with the clock and
//! RNG under test control.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use galena_types::{Mid, ReplicaId, Term};
use galena_wire::{Body, Message};

use crate::{ClusterConfig, ReplicaEvent, ReplicaOutput, ReplicaState, Role, TimeoutKind, TimingConfig};

// ============================================================================
// Helpers
// ============================================================================

/// Test clock and RNG; every protocol call threads through here.
struct Ctx {
    now: Instant,
    rng: SmallRng,
}

impl Ctx {
    fn new() -> Self {
        Self {
            now: Instant::now(),
            rng: SmallRng::seed_from_u64(0x6a1e),
        }
    }

    fn advance(&mut self, d: Duration) {
        self.now += d;
    }

    fn spawn(&mut self, id: &str, config: &ClusterConfig) -> (ReplicaState, ReplicaOutput) {
        ReplicaState::new(
            ReplicaId::new(id),
            config.clone(),
            &TimingConfig::default(),
            self.now,
            &mut self.rng,
        )
    }

    fn deliver(&mut self, state: ReplicaState, msg: Message) -> (ReplicaState, ReplicaOutput) {
        state.on_event(ReplicaEvent::Message(msg), self.now, &mut self.rng)
    }

    fn fire(&mut self, state: ReplicaState, kind: TimeoutKind) -> (ReplicaState, ReplicaOutput) {
        state.on_event(ReplicaEvent::Timeout(kind), self.now, &mut self.rng)
    }
}

fn id(s: &str) -> ReplicaId {
    ReplicaId::new(s)
}

fn three_node_config() -> ClusterConfig {
    ClusterConfig::new(vec![id("0000"), id("0001"), id("0002")])
}

/// Retargets a broadcast message at a specific recipient, the way the bus
/// fans a broadcast out to each peer.
fn addressed_to(msg: &Message, dst: &ReplicaId) -> Message {
    Message::to(msg.src.clone(), dst.clone(), msg.body.clone())
}

/// Runs a full election making `0000` the leader of term 1.
///
/// Returns (leader, follower 0001, follower 0002) with the leader's
/// election-winning heartbeat already delivered to both followers.
fn elect_0000(ctx: &mut Ctx) -> (ReplicaState, ReplicaState, ReplicaState) {
    let config = three_node_config();
    let (r0, _) = ctx.spawn("0000", &config);
    let (r1, _) = ctx.spawn("0001", &config);
    let (r2, _) = ctx.spawn("0002", &config);

    let (r0, out) = ctx.fire(r0, TimeoutKind::Election);
    let request = &out.messages[0];

    let (r1, resp1) = ctx.deliver(r1, addressed_to(request, &id("0001")));
    let (r2, resp2) = ctx.deliver(r2, addressed_to(request, &id("0002")));

    let (r0, hb) = ctx.deliver(r0, resp1.messages[0].clone());
    let (r0, _) = ctx.deliver(r0, resp2.messages[0].clone());
    assert!(r0.is_leader());

    let heartbeat = &hb.messages[0];
    let (r1, _) = ctx.deliver(r1, addressed_to(heartbeat, &id("0001")));
    let (r2, _) = ctx.deliver(r2, addressed_to(heartbeat, &id("0002")));

    (r0, r1, r2)
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn startup_broadcasts_hello() {
    let mut ctx = Ctx::new();
    let (state, out) = ctx.spawn("0000", &three_node_config());

    assert_eq!(state.role(), Role::Follower);
    assert_eq!(state.term(), Term::ZERO);
    assert!(state.leader().is_broadcast());

    assert_eq!(out.messages.len(), 1);
    assert!(out.messages[0].is_broadcast());
    assert!(matches!(out.messages[0].body, Body::Hello { .. }));

    // The election timer is armed from the start.
    assert!(state.next_deadline().is_some());
}

// ============================================================================
// Scenario A: first election
// ============================================================================

#[test]
fn scenario_a_first_election() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r0, _) = ctx.spawn("0000", &config);
    let (r1, _) = ctx.spawn("0001", &config);
    let (r2, _) = ctx.spawn("0002", &config);

    // 0000's timer fires first: it becomes Candidate for term 1 and
    // solicits votes.
    let (r0, out) = ctx.fire(r0, TimeoutKind::Election);
    assert_eq!(r0.role(), Role::Candidate);
    assert_eq!(r0.term(), Term::new(1));
    assert_eq!(r0.voted_for(), Some(&id("0000")));

    let request = &out.messages[0];
    assert!(request.is_broadcast());
    assert!(matches!(request.body, Body::RequestVote { .. }));

    // Both peers grant.
    let (r1, resp1) = ctx.deliver(r1, addressed_to(request, &id("0001")));
    let (r2, resp2) = ctx.deliver(r2, addressed_to(request, &id("0002")));
    for resp in [&resp1.messages[0], &resp2.messages[0]] {
        assert!(matches!(
            resp.body,
            Body::VoteResponse {
                vote_granted: true,
                ..
            }
        ));
    }
    assert_eq!(r1.voted_for(), Some(&id("0000")));
    assert_eq!(r2.voted_for(), Some(&id("0000")));

    // Self plus the first grant is already a strict majority of three.
    let (r0, hb) = ctx.deliver(r0, resp1.messages[0].clone());
    assert!(r0.is_leader());
    assert_eq!(r0.term(), Term::new(1));
    assert_eq!(r0.leader(), &id("0000"));

    // The win is announced with an immediate heartbeat broadcast.
    let heartbeat = &hb.messages[0];
    assert!(matches!(heartbeat.body, Body::Heartbeat { .. }));

    // The late second grant is harmless.
    let (r0, out) = ctx.deliver(r0, resp2.messages[0].clone());
    assert!(r0.is_leader());
    assert!(out.is_empty());

    // Followers observe the heartbeat and record the leader.
    let (r1, _) = ctx.deliver(r1, addressed_to(heartbeat, &id("0001")));
    let (r2, _) = ctx.deliver(r2, addressed_to(heartbeat, &id("0002")));
    assert_eq!(r1.role(), Role::Follower);
    assert_eq!(r2.role(), Role::Follower);
    assert_eq!(r1.leader(), &id("0000"));
    assert_eq!(r2.leader(), &id("0000"));
}

// ============================================================================
// Scenario B: redirect, then convergence
// ============================================================================

#[test]
fn scenario_b_put_at_follower_redirects_then_converges() {
    let mut ctx = Ctx::new();
    let (r0, r1, r2) = elect_0000(&mut ctx);

    // Client writes to a follower and is pointed at the leader.
    let put = Message::to(
        id("client"),
        id("0001"),
        Body::Put {
            key: "x".into(),
            value: "42".into(),
            mid: Mid::new("M1"),
        },
    );
    let (r1, out) = ctx.deliver(r1, put.clone());
    assert_eq!(out.messages.len(), 1);
    match &out.messages[0].body {
        Body::Redirect { leader, mid } => {
            assert_eq!(leader, &id("0000"));
            assert_eq!(mid, &Mid::new("M1"));
        }
        other => panic!("expected redirect, got {}", other.name()),
    }

    // Resent to the leader: ok plus a keys fan-out.
    let (r0, out) = ctx.deliver(r0, addressed_to(&put, &id("0000")));
    assert_eq!(r0.store().get("x"), Some("42"));
    assert_eq!(r0.propagation().outstanding(), 1);

    let fanout = out
        .messages
        .iter()
        .find(|m| matches!(m.body, Body::Keys { .. }))
        .expect("keys fan-out");
    let ok = out
        .messages
        .iter()
        .find(|m| matches!(m.body, Body::Ok { .. }))
        .expect("client ack");
    assert_eq!(ok.dst, id("client"));

    // Followers apply the propagated write; all stores converge.
    let (r1, _) = ctx.deliver(r1, addressed_to(fanout, &id("0001")));
    let (r2, _) = ctx.deliver(r2, addressed_to(fanout, &id("0002")));
    assert_eq!(r1.store().get("x"), Some("42"));
    assert_eq!(r2.store().get("x"), Some("42"));
}

// ============================================================================
// Scenario C: stale-term vote request
// ============================================================================

#[test]
fn scenario_c_stale_vote_request_is_denied_without_state_change() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r1, _) = ctx.spawn("0001", &config);

    // Move 0001 to term 5 via a heartbeat.
    let (r1, _) = ctx.deliver(
        r1,
        Message::to(
            id("0000"),
            id("0001"),
            Body::Heartbeat {
                term: Term::new(5),
                leader: id("0000"),
            },
        ),
    );
    assert_eq!(r1.term(), Term::new(5));

    let (r1, out) = ctx.deliver(
        r1,
        Message::to(
            id("0002"),
            id("0001"),
            Body::request_vote(Term::new(3), id("0002")),
        ),
    );

    match &out.messages[0].body {
        Body::VoteResponse { term, vote_granted } => {
            assert!(!vote_granted);
            assert_eq!(*term, Term::new(5));
        }
        other => panic!("expected vote_response, got {}", other.name()),
    }
    assert_eq!(r1.term(), Term::new(5));
    assert_eq!(r1.voted_for(), None);
}

// ============================================================================
// Scenario D: missing key
// ============================================================================

#[test]
fn scenario_d_get_missing_key_returns_empty_ok() {
    let mut ctx = Ctx::new();
    let (r0, _, _) = elect_0000(&mut ctx);

    let (_, out) = ctx.deliver(
        r0,
        Message::to(
            id("client"),
            id("0000"),
            Body::Get {
                key: "missing".into(),
                mid: Mid::new("M9"),
            },
        ),
    );

    match &out.messages[0].body {
        Body::Ok { mid, value } => {
            assert_eq!(mid, &Mid::new("M9"));
            assert_eq!(value.as_deref(), Some(""));
        }
        other => panic!("expected ok, got {}", other.name()),
    }
}

// ============================================================================
// Read-your-write and idempotence
// ============================================================================

#[test]
fn leader_put_then_get_roundtrips() {
    let mut ctx = Ctx::new();
    let (r0, _, _) = elect_0000(&mut ctx);

    let (r0, _) = ctx.deliver(
        r0,
        Message::to(
            id("client"),
            id("0000"),
            Body::Put {
                key: "k".into(),
                value: "v".into(),
                mid: Mid::new("M1"),
            },
        ),
    );
    let (_, out) = ctx.deliver(
        r0,
        Message::to(
            id("client"),
            id("0000"),
            Body::Get {
                key: "k".into(),
                mid: Mid::new("M2"),
            },
        ),
    );

    match &out.messages[0].body {
        Body::Ok { value, .. } => assert_eq!(value.as_deref(), Some("v")),
        other => panic!("expected ok, got {}", other.name()),
    }
}

#[test]
fn reapplied_keys_message_is_idempotent() {
    let mut ctx = Ctx::new();
    let (_, r1, _) = elect_0000(&mut ctx);

    let keys = Message::to(
        id("0000"),
        id("0001"),
        Body::Keys {
            key: "x".into(),
            value: "42".into(),
        },
    );
    let (r1, _) = ctx.deliver(r1, keys.clone());
    let len_after_first = r1.store().len();

    let (r1, _) = ctx.deliver(r1, keys);
    assert_eq!(r1.store().get("x"), Some("42"));
    assert_eq!(r1.store().len(), len_after_first);
}

// ============================================================================
// Election safety
// ============================================================================

#[test]
fn competing_candidates_elect_at_most_one_leader_per_term() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r0, _) = ctx.spawn("0000", &config);
    let (r1, _) = ctx.spawn("0001", &config);
    let (r2, _) = ctx.spawn("0002", &config);

    // Both 0000 and 0001 time out and run for term 1.
    let (r0, req0) = ctx.fire(r0, TimeoutKind::Election);
    let (r1, req1) = ctx.fire(r1, TimeoutKind::Election);

    // 0002 hears 0000 first and grants; 0001's request then finds the vote
    // already spent.
    let (r2, grant) = ctx.deliver(r2, addressed_to(&req0.messages[0], &id("0002")));
    let (r2, deny) = ctx.deliver(r2, addressed_to(&req1.messages[0], &id("0002")));
    assert!(matches!(
        grant.messages[0].body,
        Body::VoteResponse {
            vote_granted: true,
            ..
        }
    ));
    assert!(matches!(
        deny.messages[0].body,
        Body::VoteResponse {
            vote_granted: false,
            ..
        }
    ));

    // Each candidate denies the other (already voted for self).
    let (r0, deny0) = ctx.deliver(r0, addressed_to(&req1.messages[0], &id("0000")));
    let (r1, deny1) = ctx.deliver(r1, addressed_to(&req0.messages[0], &id("0001")));
    assert!(matches!(
        deny0.messages[0].body,
        Body::VoteResponse {
            vote_granted: false,
            ..
        }
    ));

    // Deliver every response; only 0000 reaches a majority.
    let (r0, _) = ctx.deliver(r0, grant.messages[0].clone());
    let (r0, _) = ctx.deliver(r0, deny1.messages[0].clone());
    let (r1, _) = ctx.deliver(r1, deny.messages[0].clone());
    let (r1, _) = ctx.deliver(r1, deny0.messages[0].clone());

    let leaders = [&r0, &r1, &r2]
        .iter()
        .filter(|r| r.is_leader())
        .count();
    assert_eq!(leaders, 1);
    assert!(r0.is_leader());
    assert_eq!(r1.role(), Role::Candidate);
}

#[test]
fn stalled_candidate_retries_with_fresh_term() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r0, _) = ctx.spawn("0000", &config);

    let (r0, _) = ctx.fire(r0, TimeoutKind::Election);
    assert_eq!(r0.term(), Term::new(1));

    // No responses arrive; the timer fires again and the election reruns.
    ctx.advance(Duration::from_millis(400));
    let (r0, out) = ctx.fire(r0, TimeoutKind::Election);
    assert_eq!(r0.role(), Role::Candidate);
    assert_eq!(r0.term(), Term::new(2));
    assert_eq!(r0.voted_for(), Some(&id("0000")));
    assert!(matches!(out.messages[0].body, Body::RequestVote { .. }));
}

#[test]
fn higher_term_heartbeat_demotes_leader() {
    let mut ctx = Ctx::new();
    let (r0, _, _) = elect_0000(&mut ctx);
    assert!(r0.is_leader());

    let (r0, _) = ctx.deliver(
        r0,
        Message::to(
            id("0001"),
            id("0000"),
            Body::Heartbeat {
                term: Term::new(2),
                leader: id("0001"),
            },
        ),
    );

    assert_eq!(r0.role(), Role::Follower);
    assert_eq!(r0.term(), Term::new(2));
    assert_eq!(r0.leader(), &id("0001"));
    assert_eq!(r0.voted_for(), None);
    assert_eq!(r0.propagation().outstanding(), 0);
}

#[test]
fn single_replica_cluster_elects_itself() {
    let mut ctx = Ctx::new();
    let config = ClusterConfig::new(vec![id("0000")]);
    let (r0, _) = ctx.spawn("0000", &config);

    let (r0, out) = ctx.fire(r0, TimeoutKind::Election);
    assert!(r0.is_leader());
    assert_eq!(r0.term(), Term::new(1));
    assert!(matches!(out.messages[0].body, Body::Heartbeat { .. }));
}

// ============================================================================
// Timers and liveness
// ============================================================================

#[test]
fn leader_reheartbeats_on_interval() {
    let mut ctx = Ctx::new();
    let (r0, _, _) = elect_0000(&mut ctx);

    let deadline = r0.next_deadline().expect("heartbeat armed");
    ctx.advance(deadline - ctx.now + Duration::from_millis(1));
    assert_eq!(r0.due(ctx.now), Some(TimeoutKind::Heartbeat));

    let (r0, out) = ctx.fire(r0, TimeoutKind::Heartbeat);
    assert!(matches!(out.messages[0].body, Body::Heartbeat { .. }));
    // Re-armed for the next interval.
    assert!(r0.next_deadline().is_some());
    assert_eq!(r0.due(ctx.now), None);
}

#[test]
fn heartbeat_resets_follower_election_timer() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r1, _) = ctx.spawn("0001", &config);

    let old_deadline = r1.next_deadline().expect("armed");

    // Just before expiry, a heartbeat arrives; the old deadline no longer
    // fires.
    ctx.now = old_deadline - Duration::from_millis(1);
    let (r1, _) = ctx.deliver(
        r1,
        Message::to(
            id("0000"),
            id("0001"),
            Body::Heartbeat {
                term: Term::new(1),
                leader: id("0000"),
            },
        ),
    );
    assert_eq!(r1.due(old_deadline), None);
}

#[test]
fn stray_response_traffic_counts_as_liveness() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r1, _) = ctx.spawn("0001", &config);

    let old_deadline = r1.next_deadline().expect("armed");
    ctx.now = old_deadline - Duration::from_millis(1);

    let (r1, out) = ctx.deliver(
        r1,
        Message::to(
            id("0000"),
            id("0001"),
            Body::Hello {
                leader: ReplicaId::broadcast(),
            },
        ),
    );
    assert!(out.is_empty());
    assert_eq!(r1.due(old_deadline), None);
}

#[test]
fn client_request_with_no_known_leader_fails() {
    let mut ctx = Ctx::new();
    let config = three_node_config();
    let (r1, _) = ctx.spawn("0001", &config);
    assert!(r1.leader().is_broadcast());

    let (_, out) = ctx.deliver(
        r1,
        Message::to(
            id("client"),
            id("0001"),
            Body::Get {
                key: "x".into(),
                mid: Mid::new("M1"),
            },
        ),
    );
    assert!(matches!(out.messages[0].body, Body::Fail { .. }));
}

// ============================================================================
// Vote-safety property
// ============================================================================

proptest! {
    /// Against any sequence of vote requests, a replica grants at most one
    /// candidate per term and its term never decreases.
    #[test]
    fn at_most_one_vote_per_term(
        requests in proptest::collection::vec((0u8..4, 1u64..6), 1..40)
    ) {
        let mut ctx = Ctx::new();
        let config = ClusterConfig::new(vec![
            id("0000"), id("0001"), id("0002"), id("0003"), id("0004"),
        ]);
        let (mut replica, _) = ctx.spawn("0000", &config);

        let mut granted: std::collections::HashMap<Term, HashSet<ReplicaId>> =
            std::collections::HashMap::new();
        let mut last_term = replica.term();

        for (candidate, term) in requests {
            let candidate = id(&format!("{:04}", u32::from(candidate) + 1));
            let msg = Message::to(
                candidate.clone(),
                id("0000"),
                Body::request_vote(Term::new(term), candidate.clone()),
            );
            let (next, out) = ctx.deliver(replica, msg);
            replica = next;

            prop_assert!(replica.term() >= last_term);
            last_term = replica.term();

            if let Body::VoteResponse { term, vote_granted: true } = out.messages[0].body {
                granted.entry(term).or_default().insert(candidate);
            }
        }

        for (term, candidates) in &granted {
            prop_assert!(
                candidates.len() <= 1,
                "granted {} candidates in term {term}",
                candidates.len()
            );
        }
    }
}
