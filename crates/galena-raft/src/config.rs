//! Cluster membership and timing configuration.

use std::time::Duration;

use galena_types::ReplicaId;

// ============================================================================
// Cluster Configuration
// ============================================================================

/// The static membership of the cluster.
///
/// Membership is fixed for the process lifetime; there is no dynamic
/// reconfiguration. Quorum math is derived from the full replica set,
/// self included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    replicas: Vec<ReplicaId>,
}

impl ClusterConfig {
    /// Creates a cluster configuration from the full replica set.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is empty or contains duplicates.
    pub fn new(replicas: Vec<ReplicaId>) -> Self {
        assert!(!replicas.is_empty(), "cluster must have at least one replica");
        for (i, id) in replicas.iter().enumerate() {
            assert!(
                !replicas[..i].contains(id),
                "duplicate replica id in cluster config: {id}"
            );
            assert!(!id.is_broadcast(), "broadcast sentinel is not a valid replica id");
        }
        Self { replicas }
    }

    /// Returns the total number of replicas, self included.
    pub fn cluster_size(&self) -> usize {
        self.replicas.len()
    }

    /// Returns the strict majority: the number of votes needed to win an
    /// election.
    pub fn quorum_size(&self) -> usize {
        self.cluster_size() / 2 + 1
    }

    /// Returns the number of replica failures the cluster can tolerate.
    pub fn max_failures(&self) -> usize {
        (self.cluster_size() - 1) / 2
    }

    /// Returns true if `id` is a member of this cluster.
    pub fn contains(&self, id: &ReplicaId) -> bool {
        self.replicas.contains(id)
    }

    /// Iterates over every replica except `me`.
    pub fn peers<'a>(&'a self, me: &'a ReplicaId) -> impl Iterator<Item = &'a ReplicaId> {
        self.replicas.iter().filter(move |id| *id != me)
    }

    /// Iterates over the full replica set.
    pub fn replicas(&self) -> impl Iterator<Item = &ReplicaId> {
        self.replicas.iter()
    }
}

// ============================================================================
// Timing Configuration
// ============================================================================

/// Timeout tuning for elections and heartbeats.
///
/// The election timeout is drawn uniformly from
/// `[election_timeout_min, election_timeout_max]` on every reset, which
/// desynchronizes concurrent elections. The heartbeat interval must sit
/// strictly below the election-timeout minimum or a healthy leader would be
/// deposed between its own heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Lower bound of the randomized election timeout.
    pub election_timeout_min: Duration,
    /// Upper bound of the randomized election timeout.
    pub election_timeout_max: Duration,
    /// Fixed interval between leader heartbeat broadcasts.
    pub heartbeat_interval: Duration,
}

impl TimingConfig {
    /// Creates a timing configuration.
    ///
    /// # Panics
    ///
    /// Panics if the bounds are inverted or the heartbeat interval does not
    /// sit below the election-timeout minimum.
    pub fn new(
        election_timeout_min: Duration,
        election_timeout_max: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        assert!(
            election_timeout_min <= election_timeout_max,
            "election timeout range is inverted"
        );
        assert!(
            heartbeat_interval < election_timeout_min,
            "heartbeat interval must be below the election timeout minimum"
        );
        Self {
            election_timeout_min,
            election_timeout_max,
            heartbeat_interval,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: Duration::from_millis(150),
            election_timeout_max: Duration::from_millis(300),
            heartbeat_interval: Duration::from_millis(50),
        }
    }
}
