//! Configuration management for Galena
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, merged by the caller)
//! 2. Environment variables (GALENA_* prefix)
//! 3. A galena.toml file passed on the command line
//! 4. Built-in defaults (lowest precedence)

use anyhow::Result;
use galena_types::BROADCAST_ID;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main Galena configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GalenaConfig {
    pub node: NodeSection,
    pub cluster: ClusterSection,
    pub timing: TimingSection,
}

/// `[node]`: this replica's identity and bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub id: String,
    pub bind: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: "0000".to_string(),
            bind: "127.0.0.1:7400".to_string(),
        }
    }
}

/// `[cluster]`: the peer replicas (everyone but this node).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSection {
    pub peers: Vec<PeerEntry>,
}

/// One peer: its replica id and socket address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub id: String,
    pub addr: String,
}

/// `[timing]`: election and heartbeat tuning, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            election_timeout_min_ms: 150,
            election_timeout_max_ms: 300,
            heartbeat_interval_ms: 50,
        }
    }
}

impl TimingSection {
    pub fn election_timeout_min(&self) -> Duration {
        Duration::from_millis(self.election_timeout_min_ms)
    }

    pub fn election_timeout_max(&self) -> Duration {
        Duration::from_millis(self.election_timeout_max_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl GalenaConfig {
    /// Load configuration from defaults and the environment.
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific TOML file (plus environment
    /// overrides).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_file(path).load()
    }

    /// Validates cross-field constraints the serde layer cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::InvalidNodeId("id must not be empty".into()));
        }
        if self.node.id == BROADCAST_ID {
            return Err(ConfigError::InvalidNodeId(format!(
                "{BROADCAST_ID} is the broadcast sentinel"
            )));
        }

        if self.timing.election_timeout_min_ms > self.timing.election_timeout_max_ms {
            return Err(ConfigError::InvalidTiming(format!(
                "election timeout range is inverted: {}..{} ms",
                self.timing.election_timeout_min_ms, self.timing.election_timeout_max_ms
            )));
        }
        if self.timing.heartbeat_interval_ms >= self.timing.election_timeout_min_ms {
            return Err(ConfigError::InvalidTiming(format!(
                "heartbeat interval ({} ms) must be below the election timeout minimum ({} ms)",
                self.timing.heartbeat_interval_ms, self.timing.election_timeout_min_ms
            )));
        }

        for (i, peer) in self.cluster.peers.iter().enumerate() {
            if peer.id.is_empty() || peer.id == BROADCAST_ID {
                return Err(ConfigError::InvalidPeer(format!(
                    "peer #{i} has reserved or empty id"
                )));
            }
            if peer.id == self.node.id {
                return Err(ConfigError::InvalidPeer(format!(
                    "peer {} duplicates the local node id",
                    peer.id
                )));
            }
            if self.cluster.peers[..i].iter().any(|p| p.id == peer.id) {
                return Err(ConfigError::InvalidPeer(format!(
                    "duplicate peer id {}",
                    peer.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, addr: &str) -> PeerEntry {
        PeerEntry {
            id: id.into(),
            addr: addr.into(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = GalenaConfig::default();
        assert_eq!(config.node.id, "0000");
        assert_eq!(config.node.bind, "127.0.0.1:7400");
        assert_eq!(config.timing.heartbeat_interval_ms, 50);
        config.validate().expect("defaults validate");
    }

    #[test]
    fn defaults_serialize_to_editable_toml() {
        // The written form is what operators hand-edit; the serde names
        // must match the section/field spelling documented above.
        let rendered = toml::to_string(&GalenaConfig::default()).expect("serialize");
        assert!(rendered.contains("[node]"));
        assert!(rendered.contains("id = \"0000\""));
        assert!(rendered.contains("[timing]"));
        assert!(rendered.contains("heartbeat_interval_ms = 50"));

        let parsed: GalenaConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed.node.bind, "127.0.0.1:7400");
    }

    #[test]
    fn broadcast_node_id_is_rejected() {
        let mut config = GalenaConfig::default();
        config.node.id = "FFFF".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNodeId(_))
        ));
    }

    #[test]
    fn inverted_timing_range_is_rejected() {
        let mut config = GalenaConfig::default();
        config.timing.election_timeout_min_ms = 500;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn heartbeat_at_election_minimum_is_rejected() {
        let mut config = GalenaConfig::default();
        config.timing.heartbeat_interval_ms = config.timing.election_timeout_min_ms;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn duplicate_peer_id_is_rejected() {
        let mut config = GalenaConfig::default();
        config.cluster.peers = vec![
            peer("0001", "127.0.0.1:7401"),
            peer("0001", "127.0.0.1:7402"),
        ];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPeer(_))));
    }

    #[test]
    fn peer_shadowing_local_id_is_rejected() {
        let mut config = GalenaConfig::default();
        config.cluster.peers = vec![peer("0000", "127.0.0.1:7401")];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPeer(_))));
    }
}
