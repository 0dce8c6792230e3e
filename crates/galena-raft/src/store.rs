//! In-memory key-value store.

use std::collections::HashMap;

/// The replicated key-value map.
///
/// Keys are unique and writes are last-write-wins. The store is owned
/// exclusively by the replica state machine: on the leader it is written
/// eagerly when a `put` is accepted, on a follower when a propagated `keys`
/// message arrives. It is never touched from another execution context.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    entries: HashMap<String, String>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, if present.
    ///
    /// The protocol's read path maps an absent key to the empty string
    /// rather than a failure; that weakening happens at the response layer,
    /// not here.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Applies a write. Re-applying the same key/value pair is a no-op
    /// beyond the first application.
    pub fn apply(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
