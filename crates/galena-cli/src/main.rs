//! Galena client CLI.
//!
//! # Quick Start
//!
//! ```bash
//! # Write a key (the client follows redirects to the leader)
//! galena --server 0000=127.0.0.1:7400 --server 0001=127.0.0.1:7401 put x 42
//!
//! # Read it back
//! galena --server 0000=127.0.0.1:7400 get x
//! ```

mod client;
mod commands;

use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use galena_types::ReplicaId;

use crate::client::Client;

/// Galena - a replicated in-memory key-value store.
#[derive(Parser)]
#[command(name = "galena")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// A cluster replica, as ID=ADDR. Repeat once per replica.
    #[arg(
        long = "server",
        value_name = "ID=ADDR",
        global = true,
        default_values_t = [String::from("0000=127.0.0.1:7400")]
    )]
    servers: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a key through the leader.
    Put {
        /// Key to write.
        key: String,

        /// Value to store.
        value: String,
    },

    /// Read a key from the leader.
    Get {
        /// Key to read.
        key: String,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let servers = cli
        .servers
        .iter()
        .map(|spec| parse_server(spec))
        .collect::<Result<Vec<_>>>()?;
    let client = Client::connect(servers).context("failed to create client")?;

    match cli.command {
        Commands::Put { key, value } => commands::put::run(&client, key, value),
        Commands::Get { key } => commands::get::run(&client, key),
    }
}

/// Parses an `ID=ADDR` server flag.
fn parse_server(spec: &str) -> Result<(ReplicaId, SocketAddr)> {
    let Some((id, addr)) = spec.split_once('=') else {
        bail!("server must be ID=ADDR, got {spec:?}");
    };
    if id.is_empty() {
        bail!("server must be ID=ADDR, got {spec:?}");
    }
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid server address {addr:?}"))?;
    Ok((ReplicaId::new(id), addr))
}
