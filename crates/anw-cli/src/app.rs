//! Wiring: configuration in, a ready [`AclGuard`] out.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use anw_acl::AclGuard;
use anw_auth::{GoTrueIdentity, IdentityProvider, StaticIdentity};
use anw_core::AnwConfig;
use anw_store::{HttpKvBackend, KvClient, MemoryKvBackend};

/// A connected guard plus what the commands need around it.
pub struct App {
    /// Guard over the configured store and identity.
    pub guard: AclGuard,
    /// The in-memory store when running offline.
    pub offline: Option<Arc<MemoryKvBackend>>,
}

impl App {
    /// Connect to the live store and identity service.
    pub fn connect(config: &AnwConfig) -> Result<Self> {
        let backend = HttpKvBackend::new(&config.store.url, config.store.request_timeout())
            .context("Failed to set up the store backend")?;
        if config.identity.token.is_none() {
            log::info!("No identity token configured; running anonymously");
        }
        let identity = GoTrueIdentity::new(config.identity.url.clone(), config.identity.token.clone());
        tracing::debug!(store = %config.store.url, identity = %config.identity.url, "Connecting");

        let client = Arc::new(KvClient::new(Arc::new(backend), Arc::new(identity)));
        Ok(Self {
            guard: AclGuard::new(client, config),
            offline: None,
        })
    }

    /// Run against an in-memory store seeded from a JSON object of
    /// key to value, signed in as `email` when given.
    pub fn offline(config: &AnwConfig, seed: &Value, email: Option<&str>) -> Result<Self> {
        let Some(entries) = seed.as_object() else {
            bail!("Offline seed must be a JSON object of key to value");
        };
        let backend = Arc::new(MemoryKvBackend::new());
        for (key, value) in entries {
            backend.insert(key, value.clone());
        }

        let identity: Arc<dyn IdentityProvider> = match email {
            Some(email) => Arc::new(StaticIdentity::signed_in(email, "offline")),
            None => Arc::new(StaticIdentity::anonymous()),
        };
        let client = Arc::new(KvClient::new(backend.clone(), identity));
        Ok(Self {
            guard: AclGuard::new(client, config),
            offline: Some(backend),
        })
    }

    /// Offline app from a seed file.
    pub fn offline_from_file(config: &AnwConfig, path: &Path, email: Option<&str>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Seed file {} is not valid JSON", path.display()))?;
        Self::offline(config, &seed, email)
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<KvClient> {
        self.guard.client()
    }
}
