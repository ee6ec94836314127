//! Error types for anw-store.

use anw_auth::AuthError;

/// Result type alias for anw-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the KV client and backends.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The store refused the request for lack of (valid) credentials.
    #[error("Auth error: {source}")]
    Auth {
        /// HTTP status, when the refusal came from the remote store
        status: Option<u16>,
        /// What was wrong with the credentials
        #[source]
        source: AuthError,
    },

    /// The store could not be reached or answered with an error status.
    #[error("Network error{}: {message}", status_suffix(.status))]
    Network {
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// What went wrong
        message: String,
    },

    /// A conditional write lost against a newer remote value.
    #[error("Conflict writing '{key}': remote value changed since it was fetched")]
    Conflict {
        /// Key being written
        key: String,
    },

    /// A value has the wrong shape.
    #[error("Validation error: {message}")]
    Validation {
        /// Key whose value failed validation
        key: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Error from anw-core
    #[error("Core error: {0}")]
    Core(#[from] anw_core::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<AuthError> for Error {
    fn from(source: AuthError) -> Self {
        Error::Auth {
            status: None,
            source,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl Error {
    /// Creates a network error without a status.
    pub fn network<S: Into<String>>(message: S) -> Self {
        Error::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a validation error for a key.
    pub fn validation<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Error::Validation {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Auth { status, .. } | Error::Network { status, .. } => *status,
            Error::Conflict { .. } => Some(412),
            _ => None,
        }
    }

    /// Transient failures worth retrying later (transport errors and 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { status, .. } => status.is_none_or(|s| s >= 500 || s == 429),
            Error::Auth { .. } | Error::Conflict { .. } | Error::Validation { .. } => false,
            Error::Core(_) => false,
        }
    }
}
