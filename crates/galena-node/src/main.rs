//! `galenad` — the Galena replica daemon.
//!
//! # Quick Start
//!
//! ```bash
//! # A three-replica cluster on localhost
//! galenad --id 0000 --bind 127.0.0.1:7400 \
//!     --peer 0001=127.0.0.1:7401 --peer 0002=127.0.0.1:7402
//! galenad --id 0001 --bind 127.0.0.1:7401 \
//!     --peer 0000=127.0.0.1:7400 --peer 0002=127.0.0.1:7402
//! galenad --id 0002 --bind 127.0.0.1:7402 \
//!     --peer 0000=127.0.0.1:7400 --peer 0001=127.0.0.1:7401
//! ```
//!
//! Flags override values from `--config <galena.toml>`, which in turn
//! overrides `GALENA_*` environment variables and the built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use galena_config::{GalenaConfig, PeerEntry};
use galena_node::Node;

/// Galena replica daemon.
#[derive(Parser)]
#[command(name = "galenad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// This replica's id.
    #[arg(long)]
    id: Option<String>,

    /// Address to bind the UDP socket to.
    #[arg(long)]
    bind: Option<String>,

    /// A peer replica, as ID=ADDR. Repeat once per peer.
    #[arg(long = "peer", value_name = "ID=ADDR")]
    peers: Vec<String>,

    /// Path to a galena.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GalenaConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GalenaConfig::load()?,
    };

    if let Some(id) = cli.id {
        config.node.id = id;
    }
    if let Some(bind) = cli.bind {
        config.node.bind = bind;
    }
    if !cli.peers.is_empty() {
        config.cluster.peers = cli
            .peers
            .iter()
            .map(|spec| parse_peer(spec))
            .collect::<Result<Vec<_>>>()?;
    }
    config.validate().context("invalid configuration")?;

    let node = Node::from_config(&config)?;
    node.run().context("node terminated")?;
    Ok(())
}

/// Parses an `ID=ADDR` peer flag.
fn parse_peer(spec: &str) -> Result<PeerEntry> {
    let Some((id, addr)) = spec.split_once('=') else {
        bail!("peer must be ID=ADDR, got {spec:?}");
    };
    if id.is_empty() || addr.is_empty() {
        bail!("peer must be ID=ADDR, got {spec:?}");
    }
    Ok(PeerEntry {
        id: id.to_string(),
        addr: addr.to_string(),
    })
}
