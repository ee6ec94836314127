//! In-process `KvBackend`.
//!
//! Behaves like the deployed store (versions, private keys, conditional
//! writes) and adds the knobs tests and offline tooling need: request
//! counters and per-key failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use anw_auth::AuthError;

use crate::backend::{KvBackend, Versioned};
use crate::{Error, Result};

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, (Value, u64)>,
    next_version: u64,
    private_keys: HashSet<String>,
    failing_keys: HashSet<String>,
    gets: HashMap<String, usize>,
    puts: HashMap<String, usize>,
}

impl MemoryState {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

fn version_tag(v: u64) -> String {
    format!("\"v{v}\"")
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryKvBackend {
    state: Mutex<MemoryState>,
}

impl MemoryKvBackend {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed of a key.
    pub fn with_value(self, key: &str, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a panicking test thread; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write a value directly, as another tab or admin would.
    pub fn insert(&self, key: &str, value: Value) {
        let mut state = self.lock();
        let version = state.bump();
        state.entries.insert(key.to_string(), (value, version));
    }

    /// Current stored value, bypassing counters and access checks.
    pub fn stored(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).map(|(v, _)| v.clone())
    }

    /// Require a token for every operation on `key`.
    pub fn mark_private(&self, key: &str) {
        self.lock().private_keys.insert(key.to_string());
    }

    /// Make every operation on `key` fail with a network error.
    pub fn fail_key(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    /// Undo [`fail_key`](Self::fail_key).
    pub fn heal_key(&self, key: &str) {
        self.lock().failing_keys.remove(key);
    }

    /// Number of `get` calls received for `key`.
    pub fn get_count(&self, key: &str) -> usize {
        self.lock().gets.get(key).copied().unwrap_or(0)
    }

    /// Number of `put` calls received for `key`.
    pub fn put_count(&self, key: &str) -> usize {
        self.lock().puts.get(key).copied().unwrap_or(0)
    }

    fn check_access(state: &MemoryState, key: &str, token: Option<&str>) -> Result<()> {
        if state.failing_keys.contains(key) {
            return Err(Error::network(format!("simulated network failure for '{key}'")));
        }
        if state.private_keys.contains(key) && token.is_none() {
            return Err(Error::Auth {
                status: Some(401),
                source: AuthError::MissingToken,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryKvBackend {
    async fn get(&self, key: &str, token: Option<&str>) -> Result<Option<Versioned>> {
        let mut state = self.lock();
        *state.gets.entry(key.to_string()).or_default() += 1;
        Self::check_access(&state, key, token)?;

        Ok(state.entries.get(key).map(|(value, version)| Versioned {
            value: value.clone(),
            version: Some(version_tag(*version)),
        }))
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        token: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<Option<String>> {
        let mut state = self.lock();
        *state.puts.entry(key.to_string()).or_default() += 1;
        Self::check_access(&state, key, token)?;

        if let Some(expected) = if_match {
            let current = state.entries.get(key).map(|(_, v)| version_tag(*v));
            if current.as_deref() != Some(expected) {
                return Err(Error::Conflict {
                    key: key.to_string(),
                });
            }
        }

        let version = state.bump();
        state
            .entries
            .insert(key.to_string(), (value.clone(), version));
        Ok(Some(version_tag(version)))
    }

    async fn delete(&self, key: &str, token: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        Self::check_access(&state, key, token)?;
        state.entries.remove(key);
        Ok(())
    }
}
