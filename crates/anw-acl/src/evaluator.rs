//! The single allow/deny primitive shared by every gate.

use crate::{AclMatrix, Role, Rule, Session};

/// Whether `role` passes `rule`.
///
/// A missing rule allows. Owner passes every role set, including an empty
/// one.
pub fn allows(rule: Option<&Rule>, role: Role, logged_in: bool) -> bool {
    match rule {
        None => true,
        Some(Rule::Public) => true,
        Some(Rule::Authenticated) => logged_in,
        Some(Rule::RoleSet(roles)) => role == Role::Owner || roles.contains(&role),
    }
}

/// Outcome of checking one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The key's rule admits the session.
    Allow,
    /// The key's rule rejects the session.
    Deny,
    /// The matrix has no rule for the key.
    Unlisted,
}

impl Decision {
    /// Whether access is granted, treating unlisted keys as `unlisted`.
    pub fn permits(self, unlisted: bool) -> bool {
        match self {
            Decision::Allow => true,
            Decision::Deny => false,
            Decision::Unlisted => unlisted,
        }
    }
}

/// A session evaluated against a matrix.
#[derive(Debug, Clone)]
pub struct AccessContext {
    /// The resolved session.
    pub session: Session,
    /// The effective matrix.
    pub matrix: AclMatrix,
}

impl AccessContext {
    /// Pair a session with a matrix.
    pub fn new(session: Session, matrix: AclMatrix) -> Self {
        Self { session, matrix }
    }

    /// Anonymous session over the default matrix.
    pub fn anonymous() -> Self {
        Self::new(Session::anonymous(), AclMatrix::default_matrix())
    }

    /// Effective role.
    pub fn role(&self) -> Role {
        self.session.role
    }

    /// Whether someone is signed in.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Check `key`.
    pub fn decide(&self, key: &str) -> Decision {
        match self.matrix.get(key) {
            None => Decision::Unlisted,
            rule @ Some(_) => {
                if allows(rule, self.role(), self.is_logged_in()) {
                    Decision::Allow
                } else {
                    Decision::Deny
                }
            }
        }
    }

    /// Check `key`, allowing unlisted keys with a warning.
    pub fn allows_key(&self, key: &str) -> bool {
        let decision = self.decide(key);
        if decision == Decision::Unlisted {
            log::warn!("No ACL rule for '{key}'; allowing");
        }
        decision.permits(true)
    }
}
