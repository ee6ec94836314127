//! Auth-specific error types.

use std::time::Duration;

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A protected operation was attempted without a token.
    #[error("missing authentication token")]
    MissingToken,

    /// The identity provider rejected the token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The identity provider returned a user without an email.
    #[error("identity missing email")]
    MissingEmail,

    /// The identity provider could not be reached or answered unexpectedly.
    #[error("identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    /// Session restoration did not finish in time.
    #[error("session restore timed out after {0:?}")]
    RestoreTimeout(Duration),
}

impl AuthError {
    /// Whether the failure is attributable to the caller's credentials
    /// (as opposed to the provider being unavailable).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken(_)
                | AuthError::MissingEmail
        )
    }
}
