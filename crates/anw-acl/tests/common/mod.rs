//! Common test utilities for anw-acl integration tests.

use std::sync::Arc;
use std::time::Duration;

use anw_acl::AclGuard;
use anw_auth::{IdentityFuture, IdentityProvider, IdentityUser, StaticIdentity};
use anw_core::AnwConfig;
use anw_store::{KvClient, MemoryKvBackend};
use serde_json::{Value, json};

/// Master email used by the harness configuration.
pub const MASTER_EMAIL: &str = "chair@aderrignw.ie";

/// A site backed by an in-memory store.
pub struct SiteHarness {
    /// The store, for seeding and fault injection.
    pub backend: Arc<MemoryKvBackend>,
    /// Configuration the guards are built from.
    pub config: AnwConfig,
}

impl SiteHarness {
    /// A site with a small directory and no stored ACL matrix.
    pub fn new() -> Self {
        let backend = Arc::new(MemoryKvBackend::new().with_value("anw_users", directory()));
        backend.mark_private("anw_users");

        let mut config = AnwConfig::default();
        config.identity.master_email = Some(MASTER_EMAIL.to_string());
        Self { backend, config }
    }

    /// Store a remote ACL matrix.
    pub fn with_acl(self, acl: Value) -> Self {
        self.backend.insert("anw_acl", acl);
        self
    }

    /// A guard for `identity`, with its own client and cache.
    pub fn guard(&self, identity: impl IdentityProvider) -> AclGuard {
        let client = Arc::new(KvClient::new(self.backend.clone(), Arc::new(identity)));
        AclGuard::new(client, &self.config)
    }

    /// A guard for nobody signed in.
    pub fn anonymous(&self) -> AclGuard {
        self.guard(StaticIdentity::anonymous())
    }

    /// A guard for a signed-in `email`.
    pub fn signed_in(&self, email: &str) -> AclGuard {
        self.guard(StaticIdentity::signed_in(email, format!("token-{email}")))
    }
}

impl Default for SiteHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The seeded member directory.
pub fn directory() -> Value {
    json!([
        {"email": "resident@aderrignw.ie", "status": "active"},
        {"email": "volunteer@aderrignw.ie", "volunteer": true, "approved": true},
        {"email": "coord@aderrignw.ie", "electedRole": "coordinator"},
        {"email": "admin@aderrignw.ie", "role": "Admin"},
        {"email": "owner@aderrignw.ie", "role": "owner"}
    ])
}

/// An identity whose session restore never finishes in time.
pub struct StalledIdentity {
    /// How long restore takes.
    pub delay: Duration,
}

impl IdentityProvider for StalledIdentity {
    fn current_user(&self) -> Option<IdentityUser> {
        None
    }

    fn token(&self) -> IdentityFuture<'_, Option<String>> {
        Box::pin(async { Ok(None) })
    }

    fn restore(&self) -> IdentityFuture<'_, Option<IdentityUser>> {
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(Some(IdentityUser::new("late@aderrignw.ie", "late")))
        })
    }
}
