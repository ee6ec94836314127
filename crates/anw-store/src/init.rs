//! Store warm-up.
//!
//! Pulls the small key set gating needs (user directory, ACL matrix) into
//! the [`KvClient`] cache. A key refreshed successfully within the TTL is not
//! fetched again unless forced, which bounds remote calls per session. Keys
//! are fetched concurrently and fail independently; a failed key is retried
//! by the next run, except when the backend refused the current identity.
//! That refusal holds for the TTL or until the signed-in user changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::Instant;

use anw_core::StoreConfig;

use crate::{Error, KvClient};

/// Outcome of one initializer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Keys fetched from the backend.
    pub fetched: Vec<String>,
    /// Keys not fetched: still fresh, or refused for the current identity.
    pub skipped: Vec<String>,
    /// Keys whose fetch failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl InitReport {
    /// Whether every requested key is now fresh in the cache.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// Refusals are keyed by the email that was refused (`None` = anonymous).
#[derive(Debug, Default)]
struct Stamps {
    refreshed: HashMap<String, Instant>,
    refused: HashMap<String, (Instant, Option<String>)>,
}

/// Idempotent, TTL-bounded cache warm-up.
pub struct StoreInitializer {
    client: Arc<KvClient>,
    default_keys: Vec<String>,
    ttl: Duration,
    stamps: Mutex<Stamps>,
}

impl StoreInitializer {
    /// Create an initializer warming `default_keys` with the given TTL.
    pub fn new(client: Arc<KvClient>, default_keys: Vec<String>, ttl: Duration) -> Self {
        Self {
            client,
            default_keys,
            ttl,
            stamps: Mutex::new(Stamps::default()),
        }
    }

    /// Initializer for the configured default keys and TTL.
    pub fn from_config(client: Arc<KvClient>, config: &StoreConfig) -> Self {
        Self::new(client, config.default_keys(), config.init_ttl())
    }

    /// The client being warmed.
    pub fn client(&self) -> &Arc<KvClient> {
        &self.client
    }

    /// Warm the default key set.
    pub async fn init(&self) -> InitReport {
        self.init_keys(None, false).await
    }

    /// Warm `keys` (default set when `None`). With `force`, fresh keys are
    /// fetched anyway.
    ///
    /// Concurrent runs are serialized, so a key is never fetched twice by
    /// overlapping callers.
    pub async fn init_keys(&self, keys: Option<&[String]>, force: bool) -> InitReport {
        let keys = keys.unwrap_or(self.default_keys.as_slice());
        let mut stamps = self.stamps.lock().await;
        let mut report = InitReport::default();
        let identity = self.client.identity().current_user().map(|u| u.email);

        let mut requested: Vec<&String> = Vec::with_capacity(keys.len());
        for key in keys {
            if !requested.contains(&key) {
                requested.push(key);
            }
        }

        let mut due = Vec::new();
        for key in requested {
            let fresh = stamps
                .refreshed
                .get(key)
                .is_some_and(|at| at.elapsed() < self.ttl);
            let refused = stamps
                .refused
                .get(key)
                .is_some_and(|(at, who)| at.elapsed() < self.ttl && *who == identity);
            if (fresh || refused) && !force {
                report.skipped.push(key.clone());
            } else {
                due.push(key.clone());
            }
        }

        let results = join_all(due.iter().map(|key| async move {
            let result = self.client.fetch(key).await;
            (key, result)
        }))
        .await;

        for (key, result) in results {
            match result {
                Ok(_) => {
                    stamps.refused.remove(key);
                    stamps.refreshed.insert(key.clone(), Instant::now());
                    report.fetched.push(key.clone());
                }
                Err(e) => {
                    log::warn!("Store init could not fetch '{key}': {e}");
                    if matches!(e, Error::Auth { .. }) {
                        stamps
                            .refused
                            .insert(key.clone(), (Instant::now(), identity.clone()));
                    }
                    report.failed.push((key.clone(), e.to_string()));
                }
            }
        }

        log::debug!(
            "Store init: {} fetched, {} skipped, {} failed",
            report.fetched.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    /// Forget refresh times and refusals so the next run fetches everything.
    pub async fn invalidate(&self) {
        let mut stamps = self.stamps.lock().await;
        stamps.refreshed.clear();
        stamps.refused.clear();
    }
}
