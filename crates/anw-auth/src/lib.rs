//! Identity primitives for the ANW access-control stack.
//!
//! Provides:
//! - [`IdentityUser`]: the signed-in user as reported by the provider
//! - [`IdentityProvider`]: trait for the identity collaborator (implement per provider)
//! - [`StaticIdentity`]: fixed identity, for tests and offline tooling
//! - [`GoTrueIdentity`]: Netlify Identity (GoTrue) provider
//! - [`restore_session`]: bounded wait for session restoration
//! - [`AuthError`]: auth-specific error types

mod error;
mod gotrue;
mod user;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use error::AuthError;
pub use gotrue::GoTrueIdentity;
pub use user::{IdentityUser, email_of};

/// Boxed future returned by [`IdentityProvider`] methods.
pub type IdentityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + Send + 'a>>;

/// The identity collaborator.
///
/// The provider is the single source of truth for "who is signed in".
/// Anything the rest of the stack keeps about the session is derived from it.
pub trait IdentityProvider: Send + Sync + 'static {
    /// The currently signed-in user, if any. Never performs I/O.
    fn current_user(&self) -> Option<IdentityUser>;

    /// Bearer token for the current user, or `None` when anonymous.
    fn token(&self) -> IdentityFuture<'_, Option<String>>;

    /// Restore a persisted session (e.g. validate a stored token).
    ///
    /// The default implementation has nothing to restore and reports
    /// [`current_user`](Self::current_user).
    fn restore(&self) -> IdentityFuture<'_, Option<IdentityUser>> {
        let user = self.current_user();
        Box::pin(async move { Ok(user) })
    }
}

/// An identity that never changes.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<IdentityUser>,
    token: Option<String>,
}

impl StaticIdentity {
    /// Nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in user with the given email and token.
    pub fn signed_in(email: &str, token: impl Into<String>) -> Self {
        Self {
            user: Some(IdentityUser::new(email, format!("static:{}", email.trim()))),
            token: Some(token.into()),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<IdentityUser> {
        self.user.clone().filter(IdentityUser::has_email)
    }

    fn token(&self) -> IdentityFuture<'_, Option<String>> {
        let token = self.current_user().and(self.token.clone());
        Box::pin(async move { Ok(token) })
    }
}

/// Wait at most `timeout` for the provider to restore its session.
///
/// Timeouts and provider errors degrade to "not logged in" with a warning;
/// an identity failure never blocks page gating.
pub async fn restore_session(
    provider: &dyn IdentityProvider,
    timeout: Duration,
) -> Option<IdentityUser> {
    match tokio::time::timeout(timeout, provider.restore()).await {
        Ok(Ok(user)) => user.filter(IdentityUser::has_email),
        Ok(Err(e)) => {
            log::warn!("Identity restore failed, continuing anonymously: {e}");
            None
        }
        Err(_) => {
            log::warn!("{}", AuthError::RestoreTimeout(timeout));
            None
        }
    }
}
