//! Raft-style leader election and key replication.
//!
//! This crate implements the Galena replica as a pure, deterministic state
//! machine: it takes messages and timer expiries as input and produces new
//! state plus outgoing messages as output. No I/O, no ambient clocks, no
//! hidden randomness — the runtime passes in `now` and the RNG, which keeps
//! every protocol path unit-testable without a network.
//!
//! # Protocol Overview
//!
//! ## Election
//!
//! ```text
//! Follower ──(election timeout)──► Candidate
//!              │
//!              ├──request_vote──► Peer₁
//!              ├──request_vote──► Peer₂
//!              │                    │
//!              │◄──vote_response────┤
//!              │◄──vote_response────┘
//!              ▼ (majority)
//!            Leader ──heartbeat──► All (immediately, then periodically)
//! ```
//!
//! ## Client Writes
//!
//! ```text
//! Client ──put──► Leader
//!                   │ apply to local store
//!                   ├──keys──► Follower₁
//!                   ├──keys──► Follower₂
//! Client ◄──ok────┘
//! ```
//!
//! A request sent to a non-leader is answered with `redirect` (leader known)
//! or `fail` (mid-election, no leader known).
//!
//! # Key Types
//!
//! - [`ReplicaState`]: the core state machine
//! - [`ReplicaEvent`] / [`ReplicaOutput`]: its input and output
//! - [`ClusterConfig`] / [`TimingConfig`]: membership and timeout tuning
//! - [`KeyStore`]: the in-memory key-value map
//! - [`Propagation`]: leader-side write fan-out bookkeeping

mod config;
mod replica;
mod replication;
mod store;
mod timer;

#[cfg(test)]
mod tests;

pub use config::{ClusterConfig, TimingConfig};
pub use replica::{ReplicaEvent, ReplicaOutput, ReplicaState, Role, TimeoutKind};
pub use replication::{PendingAck, Propagation};
pub use store::KeyStore;
pub use timer::{ElectionTimer, HeartbeatTimer};
