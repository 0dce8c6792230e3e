//! Protocol messages.
//!
//! This module defines every message that travels over the Galena bus:
//!
//! ## Election & Leadership
//! - [`Body::RequestVote`] - Candidate → Peer: vote for me in this term
//! - [`Body::VoteResponse`] - Peer → Candidate: my decision and current term
//! - [`Body::Heartbeat`] - Leader → Peer: I'm still the leader
//!
//! ## Client Traffic
//! - [`Body::Get`] - Client → Replica: read a key
//! - [`Body::Put`] - Client → Replica: write a key
//! - [`Body::Ok`] - Replica → Client: request succeeded
//! - [`Body::Fail`] - Replica → Client: cannot serve, retry
//! - [`Body::Redirect`] - Replica → Client: resend to the named leader
//!
//! ## Replication & Bootstrap
//! - [`Body::Keys`] - Leader → Follower: apply this write
//! - [`Body::Hello`] - Replica → All: I just started

use galena_types::{Mid, ReplicaId, Term};
use serde::{Deserialize, Serialize};

// ============================================================================
// Message Envelope
// ============================================================================

/// A Galena message with routing information.
///
/// Every message carries the sender and recipient id; the body fields are
/// flattened into the same JSON object, so a `put` datagram reads
/// `{"src": "...", "dst": "...", "type": "put", "key": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The endpoint that sent this message.
    pub src: ReplicaId,

    /// The intended recipient; the broadcast sentinel fans out to all
    /// replicas.
    pub dst: ReplicaId,

    /// The message payload.
    #[serde(flatten)]
    pub body: Body,
}

impl Message {
    /// Creates a message targeted at a specific endpoint.
    pub fn to(src: ReplicaId, dst: ReplicaId, body: Body) -> Self {
        Self { src, dst, body }
    }

    /// Creates a broadcast message.
    pub fn broadcast(src: ReplicaId, body: Body) -> Self {
        Self {
            src,
            dst: ReplicaId::broadcast(),
            body,
        }
    }

    /// Returns true if this message is addressed to every replica.
    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }
}

// ============================================================================
// Message Body
// ============================================================================

/// The payload of a Galena message, discriminated by the JSON `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body {
    /// Replica → All: announced once at startup.
    Hello {
        /// Always the broadcast sentinel; a freshly started replica knows
        /// no leader.
        leader: ReplicaId,
    },

    /// Candidate → Peer: request a vote for `candidate_id` in `term`.
    RequestVote {
        term: Term,
        candidate_id: ReplicaId,
        /// Vestigial log position, always zero in this log-less design.
        last_log_index: u64,
        last_log_term: Term,
    },

    /// Peer → Candidate: the vote decision, with the responder's (possibly
    /// just-updated) term.
    VoteResponse { term: Term, vote_granted: bool },

    /// Leader → Peer: leadership liveness assertion.
    Heartbeat { term: Term, leader: ReplicaId },

    /// Client → Replica: read `key`.
    Get {
        key: String,
        #[serde(rename = "MID")]
        mid: Mid,
    },

    /// Client → Replica: write `key` = `value`.
    Put {
        key: String,
        value: String,
        #[serde(rename = "MID")]
        mid: Mid,
    },

    /// Leader → Follower: apply this write directly to the local store.
    Keys { key: String, value: String },

    /// Replica → Client: success. `value` is present on `get` responses
    /// (empty string for an absent key) and omitted on `put` responses.
    Ok {
        #[serde(rename = "MID")]
        mid: Mid,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// Replica → Client: the request could not be served; retry.
    Fail {
        #[serde(rename = "MID")]
        mid: Mid,
    },

    /// Replica → Client: resend the request to `leader`.
    Redirect {
        leader: ReplicaId,
        #[serde(rename = "MID")]
        mid: Mid,
    },
}

impl Body {
    /// Returns the term carried by this message, if any.
    ///
    /// Only election and heartbeat traffic is term-versioned; client and
    /// replication messages are routed by role instead.
    pub fn term(&self) -> Option<Term> {
        match self {
            Body::RequestVote { term, .. }
            | Body::VoteResponse { term, .. }
            | Body::Heartbeat { term, .. } => Some(*term),
            Body::Hello { .. }
            | Body::Get { .. }
            | Body::Put { .. }
            | Body::Keys { .. }
            | Body::Ok { .. }
            | Body::Fail { .. }
            | Body::Redirect { .. } => None,
        }
    }

    /// Returns the wire name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Body::Hello { .. } => "hello",
            Body::RequestVote { .. } => "request_vote",
            Body::VoteResponse { .. } => "vote_response",
            Body::Heartbeat { .. } => "heartbeat",
            Body::Get { .. } => "get",
            Body::Put { .. } => "put",
            Body::Keys { .. } => "keys",
            Body::Ok { .. } => "ok",
            Body::Fail { .. } => "fail",
            Body::Redirect { .. } => "redirect",
        }
    }

    /// Creates a vote request for `candidate_id` in `term`.
    ///
    /// The log position fields are fixed at zero; they exist for schema
    /// compatibility and are ignored on receipt.
    pub fn request_vote(term: Term, candidate_id: ReplicaId) -> Self {
        Body::RequestVote {
            term,
            candidate_id,
            last_log_index: 0,
            last_log_term: Term::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_wire_shape() {
        let msg = Message::to(
            ReplicaId::new("cli-1"),
            ReplicaId::new("0000"),
            Body::Put {
                key: "x".into(),
                value: "42".into(),
                mid: Mid::new("M1"),
            },
        );

        let json: serde_json::Value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["src"], "cli-1");
        assert_eq!(json["dst"], "0000");
        assert_eq!(json["type"], "put");
        assert_eq!(json["key"], "x");
        assert_eq!(json["value"], "42");
        assert_eq!(json["MID"], "M1");
    }

    #[test]
    fn ok_without_value_omits_field() {
        let msg = Message::to(
            ReplicaId::new("0000"),
            ReplicaId::new("cli-1"),
            Body::Ok {
                mid: Mid::new("M1"),
                value: None,
            },
        );

        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(!json.contains("\"value\""));
    }

    #[test]
    fn request_vote_wire_shape() {
        let msg = Message::broadcast(
            ReplicaId::new("0001"),
            Body::request_vote(Term::new(1), ReplicaId::new("0001")),
        );

        let json: serde_json::Value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "request_vote");
        assert_eq!(json["dst"], "FFFF");
        assert_eq!(json["term"], 1);
        assert_eq!(json["candidate_id"], "0001");
        assert_eq!(json["last_log_index"], 0);
        assert_eq!(json["last_log_term"], 0);
    }

    #[test]
    fn term_extraction() {
        assert_eq!(
            Body::Heartbeat {
                term: Term::new(3),
                leader: ReplicaId::new("0000"),
            }
            .term(),
            Some(Term::new(3))
        );
        assert_eq!(
            Body::Keys {
                key: "k".into(),
                value: "v".into(),
            }
            .term(),
            None
        );
    }
}
