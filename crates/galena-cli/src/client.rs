//! UDP client for the Galena protocol.

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use galena_types::{Mid, ReplicaId};
use galena_wire::{Body, Message, WireError, decode, encode};

/// How long to wait for a single response before retrying.
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause after a `fail` response; the cluster is mid-election.
const FAIL_BACKOFF: Duration = Duration::from_millis(150);

/// Total attempts (including redirect hops) before giving up.
const MAX_ATTEMPTS: usize = 20;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),

    #[error("no replica answered after {0} attempts")]
    Unavailable(usize),
}

/// A one-shot request client.
///
/// Holds the cluster address book so it can chase `redirect` responses: a
/// redirect names the leader by replica id, and the book maps that id back
/// to a socket address.
pub struct Client {
    socket: UdpSocket,
    client_id: ReplicaId,
    servers: Vec<(ReplicaId, SocketAddr)>,
}

impl Client {
    /// Binds an ephemeral socket against the given replica address book.
    pub fn connect(servers: Vec<(ReplicaId, SocketAddr)>) -> Result<Self, ClientError> {
        assert!(!servers.is_empty(), "client needs at least one server");
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(RESPONSE_TIMEOUT))?;

        // Tie the id to the ephemeral port so concurrent invocations don't
        // shadow each other in the replicas' client address books.
        let client_id = ReplicaId::new(format!("cli-{}", socket.local_addr()?.port()));

        Ok(Self {
            socket,
            client_id,
            servers,
        })
    }

    /// Writes `key` = `value` through the leader.
    pub fn put(&self, key: String, value: String) -> Result<(), ClientError> {
        let mid = fresh_mid();
        let body = Body::Put {
            key,
            value,
            mid: mid.clone(),
        };
        self.request(body, &mid).map(|_| ())
    }

    /// Reads `key` from the leader. An unset key reads as the empty string.
    pub fn get(&self, key: String) -> Result<String, ClientError> {
        let mid = fresh_mid();
        let body = Body::Get {
            key,
            mid: mid.clone(),
        };
        let value = self.request(body, &mid)?;
        Ok(value.unwrap_or_default())
    }

    /// Sends a request until an `ok` for our `mid` arrives, following
    /// redirects and backing off on `fail`.
    fn request(&self, body: Body, mid: &Mid) -> Result<Option<String>, ClientError> {
        let mut target = self.servers[0].1;
        let mut rotate = 0;

        for _ in 0..MAX_ATTEMPTS {
            let msg = Message::to(self.client_id.clone(), ReplicaId::broadcast(), body.clone());
            self.socket.send_to(&encode(&msg)?, target)?;

            match self.await_response(mid) {
                Some(Body::Ok { value, .. }) => return Ok(value),
                Some(Body::Redirect { leader, .. }) => {
                    tracing::debug!(leader = %leader, "redirected");
                    if let Some((_, addr)) = self.servers.iter().find(|(id, _)| *id == leader) {
                        target = *addr;
                    }
                }
                Some(Body::Fail { .. }) => {
                    tracing::debug!("replica cannot serve yet, backing off");
                    thread::sleep(FAIL_BACKOFF);
                }
                Some(_) | None => {
                    // Timed out or saw noise; try the next replica in case
                    // this one is down.
                    rotate = (rotate + 1) % self.servers.len();
                    target = self.servers[rotate].1;
                }
            }
        }

        Err(ClientError::Unavailable(MAX_ATTEMPTS))
    }

    /// Waits one timeout window for a response matching `mid`.
    fn await_response(&self, mid: &Mid) -> Option<Body> {
        let mut buf = [0u8; galena_wire::MAX_DATAGRAM];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).ok()?;
            let Ok(msg) = decode(&buf[..len]) else {
                continue;
            };
            let matches = match &msg.body {
                Body::Ok { mid: m, .. }
                | Body::Fail { mid: m }
                | Body::Redirect { mid: m, .. } => m == mid,
                _ => false,
            };
            if matches {
                return Some(msg.body);
            }
        }
    }
}

/// Generates a fresh client message id.
fn fresh_mid() -> Mid {
    Mid::new(format!("{:016x}", rand::random::<u64>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mids_are_distinct() {
        assert_ne!(fresh_mid(), fresh_mid());
    }

    #[test]
    #[should_panic(expected = "at least one server")]
    fn connect_requires_servers() {
        let _ = Client::connect(vec![]);
    }
}
