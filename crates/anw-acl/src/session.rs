//! Session resolution: who is signed in and what role they carry.
//!
//! The identity provider is the only source of truth for the signed-in
//! user. The role comes from the member directory, except for the optional
//! master email, which always resolves to [`Role::Owner`].

use std::sync::Arc;

use anw_auth::{IdentityProvider, IdentityUser, email_of};
use anw_core::{IdentityConfig, normalize_email};

use crate::{Role, UserDirectory};

/// The resolved session for one page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Normalized email, empty when anonymous.
    pub email: String,
    /// Effective role.
    pub role: Role,
}

impl Session {
    /// The anonymous session.
    pub fn anonymous() -> Self {
        Self {
            email: String::new(),
            role: Role::Public,
        }
    }

    /// Whether someone is signed in.
    pub fn is_logged_in(&self) -> bool {
        !self.email.is_empty()
    }
}

/// Role for `user` according to `directory`.
///
/// Anonymous users are [`Role::Public`]; signed-in users without a record
/// are [`Role::Resident`].
pub fn resolve_role(user: Option<&IdentityUser>, directory: &UserDirectory) -> Role {
    let email = email_of(user);
    if email.is_empty() {
        return Role::Public;
    }
    directory
        .lookup(email)
        .map(|entry| entry.role)
        .unwrap_or(Role::Resident)
}

/// Resolves sessions against an identity provider.
pub struct SessionResolver {
    identity: Arc<dyn IdentityProvider>,
    master_email: Option<String>,
}

impl SessionResolver {
    /// Create a resolver. A blank master email is ignored.
    pub fn new(identity: Arc<dyn IdentityProvider>, master_email: Option<&str>) -> Self {
        Self {
            identity,
            master_email: master_email
                .map(normalize_email)
                .filter(|e| !e.is_empty()),
        }
    }

    /// Resolver using the configured master email.
    pub fn from_config(identity: Arc<dyn IdentityProvider>, config: &IdentityConfig) -> Self {
        Self::new(identity, config.master_email.as_deref())
    }

    /// Whether the provider reports a signed-in user.
    pub fn is_logged_in(&self) -> bool {
        !self.logged_email().is_empty()
    }

    /// Normalized email of the signed-in user, or `""`.
    pub fn logged_email(&self) -> String {
        email_of(self.identity.current_user().as_ref()).to_string()
    }

    /// Effective role of the current user.
    pub fn role(&self, directory: &UserDirectory) -> Role {
        self.resolve(directory).role
    }

    /// Resolve the current provider user.
    pub fn resolve(&self, directory: &UserDirectory) -> Session {
        self.resolve_user(self.identity.current_user().as_ref(), directory)
    }

    /// Resolve an explicit user, e.g. the result of a session restore.
    pub fn resolve_user(&self, user: Option<&IdentityUser>, directory: &UserDirectory) -> Session {
        let email = email_of(user).to_string();
        if !email.is_empty() && self.master_email.as_deref() == Some(email.as_str()) {
            return Session {
                email,
                role: Role::Owner,
            };
        }
        Session {
            role: resolve_role(user, directory),
            email,
        }
    }
}
