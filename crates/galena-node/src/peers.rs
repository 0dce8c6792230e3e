//! Endpoint address book.

use std::collections::HashMap;
use std::net::SocketAddr;

use galena_types::ReplicaId;

/// Maps endpoint ids to socket addresses.
///
/// Replica addresses are static deployment configuration. Client addresses
/// cannot be configured up front, so they are learned from the source
/// address of each inbound datagram; a later datagram from the same id
/// overwrites the entry (clients may rebind between requests).
#[derive(Debug)]
pub struct PeerBook {
    replicas: HashMap<ReplicaId, SocketAddr>,
    clients: HashMap<ReplicaId, SocketAddr>,
}

impl PeerBook {
    /// Creates a book over the configured peer replicas.
    pub fn new(replicas: impl IntoIterator<Item = (ReplicaId, SocketAddr)>) -> Self {
        Self {
            replicas: replicas.into_iter().collect(),
            clients: HashMap::new(),
        }
    }

    /// Returns true if `id` is a configured peer replica.
    pub fn is_replica(&self, id: &ReplicaId) -> bool {
        self.replicas.contains_key(id)
    }

    /// Records the observed source address of a client datagram.
    ///
    /// Replica entries are never overwritten; their addresses come from
    /// configuration, not from whatever a datagram claims.
    pub fn observe(&mut self, id: ReplicaId, addr: SocketAddr) {
        if !self.replicas.contains_key(&id) {
            self.clients.insert(id, addr);
        }
    }

    /// Resolves an endpoint id to a socket address.
    pub fn lookup(&self, id: &ReplicaId) -> Option<SocketAddr> {
        self.replicas
            .get(id)
            .or_else(|| self.clients.get(id))
            .copied()
    }

    /// Iterates over every configured peer replica.
    pub fn replica_addrs(&self) -> impl Iterator<Item = (&ReplicaId, SocketAddr)> {
        self.replicas.iter().map(|(id, addr)| (id, *addr))
    }
}
