//! # galena-types: Core types for Galena
//!
//! This crate contains shared types used across the Galena system:
//! - Replica identity ([`ReplicaId`]) and the broadcast sentinel
//! - Election epochs ([`Term`])
//! - Client message ids ([`Mid`])
//!
//! All types are small serde-derived values with no behavior beyond identity
//! and ordering, so every other crate can depend on this one without pulling
//! in protocol logic.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Replica Identity
// ============================================================================

/// The wire spelling of the broadcast destination.
pub const BROADCAST_ID: &str = "FFFF";

/// Unique identifier for a replica or client endpoint.
///
/// Ids are opaque strings assigned at deployment time (replicas) or chosen by
/// the client (clients). The reserved id `FFFF` is the broadcast sentinel: as
/// a destination it means "every replica", and as a recorded leader it means
/// "no leader known".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(String);

impl ReplicaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the broadcast sentinel id.
    pub fn broadcast() -> Self {
        Self(BROADCAST_ID.to_string())
    }

    /// Returns true if this is the broadcast sentinel.
    pub fn is_broadcast(&self) -> bool {
        self.0 == BROADCAST_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Term
// ============================================================================

/// Monotonically increasing election epoch.
///
/// At most one leader can be elected per term. A replica's term never
/// decreases across its lifetime; comparing terms resolves stale leadership
/// claims.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Term(u64);

impl Term {
    /// The initial term, before any election has run.
    pub const ZERO: Term = Term(0);

    pub fn new(term: u64) -> Self {
        Self(term)
    }

    /// Returns the next term.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Client Message Id
// ============================================================================

/// Client-issued message id, echoed back verbatim on responses.
///
/// The store does not deduplicate by `Mid`; it only carries the id through so
/// the client can correlate responses with outstanding requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mid(String);

impl Mid {
    pub fn new(mid: impl Into<String>) -> Self {
        Self(mid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Mid {
    fn from(mid: &str) -> Self {
        Self::new(mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_sentinel() {
        let id = ReplicaId::broadcast();
        assert!(id.is_broadcast());
        assert_eq!(id.as_str(), "FFFF");
        assert!(!ReplicaId::new("0001").is_broadcast());
    }

    #[test]
    fn term_is_monotone_under_next() {
        let t = Term::ZERO;
        let t1 = t.next();
        assert!(t1 > t);
        assert_eq!(t1.as_u64(), 1);
        assert_eq!(t1.next().as_u64(), 2);
    }

    #[test]
    fn term_ordering_matches_u64() {
        assert!(Term::new(3) > Term::new(2));
        assert_eq!(Term::new(7), Term::new(7));
    }

    #[test]
    fn replica_id_display_roundtrip() {
        let id = ReplicaId::new("0002");
        assert_eq!(id.to_string(), "0002");
    }
}
