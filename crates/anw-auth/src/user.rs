//! Signed-in user identity as reported by the identity provider.

use anw_core::normalize_email;

/// The identity provider's view of the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    /// The user's email, normalized (trimmed, lower-cased).
    pub email: String,
    /// The provider's unique subject identifier.
    pub subject: String,
}

impl IdentityUser {
    /// Create a user, normalizing the email.
    pub fn new(email: &str, subject: impl Into<String>) -> Self {
        Self {
            email: normalize_email(email),
            subject: subject.into(),
        }
    }

    /// A user only counts as signed in when the provider gave an email.
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// Email of the user, or `""` when nobody is signed in.
pub fn email_of(user: Option<&IdentityUser>) -> &str {
    user.map(|u| u.email.as_str()).unwrap_or("")
}
