//! Page-load orchestration and ACL administration.
//!
//! [`AclGuard::guard`] runs one page load end to end: bounded identity
//! restore, store warm-up, session resolution, effective matrix, then the
//! three gates. No step can fail the load; each degrades to cached or
//! default data with a warning.
//!
//! The admin operations are the only writers of the ACL matrix. They go
//! through [`KvClient::save_checked`], so a concurrent edit surfaces as a
//! conflict instead of being overwritten.

use std::sync::Arc;
use std::time::Duration;

use anw_auth::{IdentityUser, restore_session};
use anw_core::{AclConfig, AnwConfig};
use anw_store::{KvClient, StoreInitializer};

use crate::evaluator::AccessContext;
use crate::gate::{self, GateOutcome};
use crate::page::{Navigator, PageDocument, Routes};
use crate::{AclMatrix, Error, Result, Role, SessionResolver, UserDirectory};

/// Gates pages and administers the matrix for one site.
pub struct AclGuard {
    initializer: StoreInitializer,
    resolver: SessionResolver,
    acl: AclConfig,
    routes: Routes,
    users_key: String,
    acl_key: String,
    restore_timeout: Duration,
}

impl AclGuard {
    /// Build a guard over `client` from the loaded configuration.
    pub fn new(client: Arc<KvClient>, config: &AnwConfig) -> Self {
        let resolver = SessionResolver::from_config(client.identity().clone(), &config.identity);
        Self {
            initializer: StoreInitializer::from_config(client, &config.store),
            resolver,
            acl: config.acl.clone(),
            routes: Routes::with_overrides(&config.acl.routes),
            users_key: config.store.users_key.clone(),
            acl_key: config.store.acl_key.clone(),
            restore_timeout: config.identity.restore_timeout(),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<KvClient> {
        self.initializer.client()
    }

    /// The store initializer.
    pub fn initializer(&self) -> &StoreInitializer {
        &self.initializer
    }

    /// Gate configuration.
    pub fn config(&self) -> &AclConfig {
        &self.acl
    }

    /// Route table used by the navigation filter.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Cached member directory; empty when never fetched.
    pub fn directory(&self) -> UserDirectory {
        self.client()
            .get_value(&self.users_key)
            .map(|v| UserDirectory::from_value(&v))
            .unwrap_or_default()
    }

    /// Restore the identity session, waiting at most the configured timeout.
    pub async fn restore(&self) -> Option<IdentityUser> {
        restore_session(self.client().identity().as_ref(), self.restore_timeout).await
    }

    /// Restore, warm the store and resolve the access context.
    pub async fn context(&self) -> AccessContext {
        let user = self.restore().await;
        let report = self.initializer.init().await;
        if !report.is_complete() {
            log::warn!(
                "Gating with cached data; {} key(s) could not be refreshed",
                report.failed.len()
            );
        }
        self.context_for(user.as_ref())
    }

    /// Access context for `user` from cached data only.
    pub fn context_for(&self, user: Option<&IdentityUser>) -> AccessContext {
        let session = self.resolver.resolve_user(user, &self.directory());
        log::debug!(
            "Session resolved: role={} logged_in={}",
            session.role,
            session.is_logged_in()
        );
        AccessContext::new(session, self.acl_cached())
    }

    /// Gate one page load.
    pub async fn guard(&self, page: &mut PageDocument, navigator: &mut dyn Navigator) -> GateOutcome {
        if page.is_preview() {
            return GateOutcome::preview();
        }
        let ctx = self.context().await;
        gate::apply(&ctx, &self.acl, &self.routes, page, navigator)
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    /// Effective matrix from the cache, without I/O.
    pub fn acl_cached(&self) -> AclMatrix {
        AclMatrix::effective(self.client().get_value(&self.acl_key).as_ref())
    }

    /// Effective matrix after refetching the stored one. A failed fetch
    /// falls back to the cache.
    pub async fn acl_fresh(&self) -> AclMatrix {
        if let Err(e) = self.client().fetch(&self.acl_key).await {
            log::warn!("Could not refresh ACL matrix, using cached: {e}");
        }
        self.acl_cached()
    }

    /// Store `matrix`, failing with a conflict if the stored matrix changed
    /// since it was last fetched.
    pub async fn set_acl(&self, matrix: &AclMatrix) -> Result<()> {
        self.client()
            .save_checked(&self.acl_key, matrix.to_value())
            .await?;
        log::info!("ACL matrix saved ({} keys)", matrix.len());
        Ok(())
    }

    /// Add `role` to `key` and store the result.
    pub async fn grant(&self, key: &str, role: Role) -> Result<AclMatrix> {
        self.edit(key, |m| Ok(m.grant(key, role))).await
    }

    /// Remove `role` from `key` and store the result.
    pub async fn revoke(&self, key: &str, role: Role) -> Result<AclMatrix> {
        self.edit(key, |m| m.revoke(key, role)).await
    }

    async fn edit<F>(&self, key: &str, change: F) -> Result<AclMatrix>
    where
        F: FnOnce(&mut AclMatrix) -> Result<bool>,
    {
        check_key(key)?;
        // Admin edits need the current version; a failed fetch aborts.
        let remote = self.client().fetch(&self.acl_key).await?;
        let mut matrix = AclMatrix::effective(remote.as_ref());
        if change(&mut matrix)? {
            self.set_acl(&matrix.overrides()).await?;
        } else {
            log::info!("ACL '{}' unchanged", key.trim());
        }
        Ok(matrix)
    }
}

fn check_key(key: &str) -> Result<()> {
    let key = key.trim();
    match key.split_once(':') {
        Some((ns, rest)) if !ns.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err(Error::validation_key(
            key,
            "permission keys look like 'page:<name>' or 'feature:<name>'",
        )),
    }
}
