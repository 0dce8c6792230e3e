//! Put command - write a key through the leader.

use anyhow::{Context, Result};

use crate::client::Client;

pub fn run(client: &Client, key: String, value: String) -> Result<()> {
    client
        .put(key.clone(), value)
        .with_context(|| format!("put {key:?} failed"))?;
    println!("ok");
    Ok(())
}
