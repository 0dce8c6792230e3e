//! The node event loop.

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use galena_config::GalenaConfig;
use galena_raft::{ClusterConfig, ReplicaEvent, ReplicaOutput, ReplicaState, TimingConfig};
use galena_types::ReplicaId;
use galena_wire::MAX_DATAGRAM;

use crate::error::{NodeError, NodeResult};
use crate::peers::PeerBook;

const SOCKET: Token = Token(0);

/// A Galena node: one UDP socket, one replica, one event loop.
///
/// The loop waits on the socket with a timeout equal to the replica's
/// earliest timer deadline, then feeds whichever came first — a decoded
/// datagram or a due timeout — into the state machine and sends the
/// resulting messages. Sends are fire-and-forget; a failed send is logged
/// and dropped, matching the lossy-channel contract.
pub struct Node {
    local_id: ReplicaId,
    cluster: ClusterConfig,
    timing: TimingConfig,
    socket: UdpSocket,
    poll: Poll,
    peers: PeerBook,
}

impl Node {
    /// Builds a node from validated configuration: parses addresses, binds
    /// the socket, and registers it with the poller.
    pub fn from_config(config: &GalenaConfig) -> NodeResult<Self> {
        config.validate()?;

        let bind: SocketAddr =
            config
                .node
                .bind
                .parse()
                .map_err(|_| NodeError::InvalidAddr {
                    id: config.node.id.clone(),
                    addr: config.node.bind.clone(),
                })?;

        let mut peer_addrs = Vec::with_capacity(config.cluster.peers.len());
        for peer in &config.cluster.peers {
            let addr: SocketAddr = peer.addr.parse().map_err(|_| NodeError::InvalidAddr {
                id: peer.id.clone(),
                addr: peer.addr.clone(),
            })?;
            peer_addrs.push((ReplicaId::new(peer.id.clone()), addr));
        }

        let local_id = ReplicaId::new(config.node.id.clone());
        let replicas = std::iter::once(local_id.clone())
            .chain(peer_addrs.iter().map(|(id, _)| id.clone()))
            .collect();

        let mut socket = UdpSocket::bind(bind).map_err(|source| NodeError::BindFailed {
            addr: bind,
            source,
        })?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, SOCKET, Interest::READABLE)?;

        Ok(Self {
            local_id,
            cluster: ClusterConfig::new(replicas),
            timing: TimingConfig::new(
                config.timing.election_timeout_min(),
                config.timing.election_timeout_max(),
                config.timing.heartbeat_interval(),
            ),
            socket,
            poll,
            peers: PeerBook::new(peer_addrs),
        })
    }

    /// Returns the address the socket actually bound to.
    ///
    /// Differs from the configured address when binding to port 0.
    pub fn local_addr(&self) -> NodeResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs the event loop. Does not return except on a fatal I/O error.
    pub fn run(mut self) -> NodeResult<()> {
        let mut rng = SmallRng::from_entropy();
        let (mut replica, startup) = ReplicaState::new(
            self.local_id.clone(),
            self.cluster.clone(),
            &self.timing,
            Instant::now(),
            &mut rng,
        );
        self.send_output(startup);

        tracing::info!(
            replica = %self.local_id,
            cluster_size = self.cluster.cluster_size(),
            "node running"
        );

        let mut events = Events::with_capacity(64);
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            let timeout = replica
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()));
            self.poll.poll(&mut events, timeout)?;

            // Drain every readable datagram before looking at the clock.
            loop {
                match self.socket.recv_from(&mut buf) {
                    Ok((len, addr)) => {
                        match galena_wire::decode(&buf[..len]) {
                            Ok(msg) => {
                                self.peers.observe(msg.src.clone(), addr);
                                let (next, output) = replica.on_event(
                                    ReplicaEvent::Message(msg),
                                    Instant::now(),
                                    &mut rng,
                                );
                                replica = next;
                                self.send_output(output);
                            }
                            Err(err) => {
                                tracing::warn!(%addr, error = %err, "dropping malformed datagram");
                            }
                        }
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e.into()),
                }
            }

            // Fire whatever deadlines have passed.
            loop {
                let now = Instant::now();
                let Some(kind) = replica.due(now) else { break };
                let (next, output) = replica.on_event(ReplicaEvent::Timeout(kind), now, &mut rng);
                replica = next;
                self.send_output(output);
            }
        }
    }

    /// Encodes and sends every message in an output. Failures are logged
    /// and dropped; the protocol tolerates loss.
    fn send_output(&self, output: ReplicaOutput) {
        for msg in output.messages {
            let bytes = match galena_wire::encode(&msg) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(kind = msg.body.name(), error = %err, "failed to encode message");
                    continue;
                }
            };

            if msg.is_broadcast() {
                for (id, addr) in self.peers.replica_addrs() {
                    if let Err(err) = self.socket.send_to(&bytes, addr) {
                        tracing::warn!(peer = %id, %addr, error = %err, "send failed");
                    }
                }
            } else if let Some(addr) = self.peers.lookup(&msg.dst) {
                if let Err(err) = self.socket.send_to(&bytes, addr) {
                    tracing::warn!(dst = %msg.dst, %addr, error = %err, "send failed");
                }
            } else {
                tracing::warn!(dst = %msg.dst, kind = msg.body.name(), "dropping message to unknown destination");
            }
        }
    }
}
