//! Cached KV client.
//!
//! Data flows one way: async [`KvClient::fetch`] populates the cache,
//! synchronous [`KvClient::get`] reads it. Reads never touch the network,
//! so gating code never waits on I/O.
//!
//! Writes are optimistic. [`KvClient::save`] updates the cache first and
//! marks the entry dirty until the backend confirms; a failed write leaves
//! the entry dirty for [`KvClient::reconcile`] instead of pretending it
//! succeeded. [`KvClient::save_checked`] is the conflict-aware variant for
//! admin edits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use anw_auth::IdentityProvider;

use crate::backend::KvBackend;
use crate::{Error, Result};

/// A cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Cached value; `Null` when the key is absent remotely.
    pub value: Value,
    /// When the value was fetched or locally written.
    pub fetched_at: DateTime<Utc>,
    /// Backend version tag of the value, if known.
    pub version: Option<String>,
    /// Sequence number of an unconfirmed local write.
    pending_write: Option<u64>,
}

impl CacheEntry {
    fn fetched(value: Value, version: Option<String>) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
            version,
            pending_write: None,
        }
    }

    /// Whether the entry holds a local write the backend has not confirmed.
    pub fn is_dirty(&self) -> bool {
        self.pending_write.is_some()
    }
}

/// KV client with an explicit, per-instance cache.
pub struct KvClient {
    backend: Arc<dyn KvBackend>,
    identity: Arc<dyn IdentityProvider>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    write_seq: AtomicU64,
}

impl KvClient {
    /// Create a client over a backend, authenticating as `identity`.
    pub fn new(backend: Arc<dyn KvBackend>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            backend,
            identity,
            cache: RwLock::new(HashMap::new()),
            write_seq: AtomicU64::new(0),
        }
    }

    /// The identity requests are made as.
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------------
    // Synchronous reads
    // ------------------------------------------------------------------------

    /// Cached value of `key` deserialized as `T`, or `fallback` when the key
    /// was never populated, is `null`, or has a different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get_value(key) {
            Some(Value::Null) | None => fallback,
            Some(value) => match serde_json::from_value(value) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("Cached value for '{key}' has an unexpected shape: {e}");
                    fallback
                }
            },
        }
    }

    /// Raw cached value of `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read_cache().get(key).map(|e| e.value.clone())
    }

    /// Snapshot of the cache entry for `key`.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.read_cache().get(key).cloned()
    }

    /// Whether `key` has been populated.
    pub fn contains(&self, key: &str) -> bool {
        self.read_cache().contains_key(key)
    }

    /// Keys holding unconfirmed local writes.
    pub fn dirty_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read_cache()
            .iter()
            .filter(|(_, e)| e.is_dirty())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    // ------------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------------

    /// Bearer token of the current user. Identity failures degrade to an
    /// anonymous request.
    async fn token(&self) -> Option<String> {
        match self.identity.token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("No identity token, requesting anonymously: {e}");
                None
            }
        }
    }

    /// Fetch `key` from the backend into the cache.
    ///
    /// Returns the value, `None` when the key is absent or `null`. Errors
    /// carry the HTTP status when there was one; callers decide the fallback.
    pub async fn fetch(&self, key: &str) -> Result<Option<Value>> {
        let token = self.token().await;
        let fetched = self.backend.get(key, token.as_deref()).await?;

        let (value, version) = match fetched {
            Some(v) => (v.value, v.version),
            None => (Value::Null, None),
        };

        let previous = self
            .write_cache()
            .insert(key.to_string(), CacheEntry::fetched(value.clone(), version));
        if previous.is_some_and(|e| e.is_dirty()) {
            log::warn!("Fetch of '{key}' replaced an unconfirmed local write");
        }
        log::debug!("Fetched '{key}' into cache");

        Ok((!value.is_null()).then_some(value))
    }

    /// Replace `key` remotely, updating the cache first.
    ///
    /// Returns `true` once the backend confirms. On failure the cache keeps
    /// the new value marked dirty and `false` is returned; this never errors.
    pub async fn save(&self, key: &str, value: Value) -> bool {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut cache = self.write_cache();
            let version = cache.get(key).and_then(|e| e.version.clone());
            cache.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    fetched_at: Utc::now(),
                    version,
                    pending_write: Some(seq),
                },
            );
        }

        let token = self.token().await;
        match self.backend.put(key, &value, token.as_deref(), None).await {
            Ok(version) => {
                self.confirm_write(key, seq, version);
                true
            }
            Err(e) => {
                log::warn!("Save of '{key}' not confirmed, kept locally as dirty: {e}");
                false
            }
        }
    }

    /// Replace `key` only if the remote value is still the one last fetched.
    ///
    /// Uses the cached version as a precondition; a newer remote value yields
    /// [`Error::Conflict`] and leaves the cache untouched. Any other failure
    /// also leaves the cache untouched.
    pub async fn save_checked(&self, key: &str, value: Value) -> Result<()> {
        let expected = self.entry(key).and_then(|e| e.version);
        if expected.is_none() {
            log::debug!("No cached version for '{key}', writing unconditionally");
        }

        let token = self.token().await;
        let version = self
            .backend
            .put(key, &value, token.as_deref(), expected.as_deref())
            .await?;

        self.write_cache()
            .insert(key.to_string(), CacheEntry::fetched(value, version));
        Ok(())
    }

    /// Remove `key` remotely and evict it from the cache.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let token = self.token().await;
        self.backend.delete(key, token.as_deref()).await?;
        self.write_cache().remove(key);
        Ok(())
    }

    /// Retry every dirty entry. Returns how many are still dirty afterwards.
    pub async fn reconcile(&self) -> usize {
        let pending: Vec<(String, Value, u64)> = self
            .read_cache()
            .iter()
            .filter_map(|(k, e)| e.pending_write.map(|seq| (k.clone(), e.value.clone(), seq)))
            .collect();

        if pending.is_empty() {
            return 0;
        }

        let token = self.token().await;
        for (key, value, seq) in pending {
            match self.backend.put(&key, &value, token.as_deref(), None).await {
                Ok(version) => {
                    log::info!("Reconciled pending write of '{key}'");
                    self.confirm_write(&key, seq, version);
                }
                Err(e) => log::warn!("Pending write of '{key}' still failing: {e}"),
            }
        }

        self.dirty_keys().len()
    }

    /// Mark a write confirmed, unless a newer local write superseded it.
    fn confirm_write(&self, key: &str, seq: u64, version: Option<String>) {
        let mut cache = self.write_cache();
        if let Some(entry) = cache.get_mut(key)
            && entry.pending_write == Some(seq)
        {
            entry.pending_write = None;
            entry.version = version;
        }
    }
}

impl std::fmt::Debug for KvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvClient")
            .field("cached_keys", &self.read_cache().len())
            .finish()
    }
}
