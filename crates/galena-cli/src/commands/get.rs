//! Get command - read a key from the leader.
//!
//! An unset key prints an empty line; the protocol does not distinguish
//! "unset" from "set to empty".

use anyhow::{Context, Result};

use crate::client::Client;

pub fn run(client: &Client, key: String) -> Result<()> {
    let value = client
        .get(key.clone())
        .with_context(|| format!("get {key:?} failed"))?;
    println!("{value}");
    Ok(())
}
