//! Galena replica daemon.
//!
//! Hosts the [`galena_raft`] replica state machine behind a single-threaded
//! UDP event loop: one mio poll waits on the socket with a timeout equal to
//! the replica's earliest timer deadline, so inbound datagrams and timer
//! expiries funnel through the same actor in strict arrival order. No other
//! execution context ever touches replica state.

mod error;
mod peers;
mod runtime;

pub use error::{NodeError, NodeResult};
pub use peers::PeerBook;
pub use runtime::Node;
