//! Key-value backends the store persists through.
//!
//! The [`KvBackend`] trait abstracts over durable storage (SQLite, see
//! [`SqliteBackend`](crate::SqliteBackend)) and the in-memory map used in
//! tests and ephemeral sessions.

use std::collections::HashMap;

use crate::error::Result;

/// String-keyed, string-valued storage.
///
/// Implementations only need to make each call durable on its own; the
/// [`Store`](crate::Store) serializes read-modify-write sequences.
pub trait KvBackend: Send {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any existing value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// List stored keys in ascending order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// A backend that keeps everything in a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with raw values, e.g. data copied out of a browser.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
