//! Error types for anw-acl

use thiserror::Error;

/// Result type alias for anw-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in anw-acl
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from anw-core
    #[error("Core error: {0}")]
    Core(#[from] anw_core::Error),

    /// Error from anw-store
    #[error("Store error: {0}")]
    Store(#[from] anw_store::Error),

    /// A rule, role or matrix has the wrong shape.
    #[error("Validation error{}: {message}", key_suffix(.key))]
    Validation {
        /// Permission key involved, if any
        key: Option<String>,
        /// What went wrong
        message: String,
    },
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_deref()
        .map(|k| format!(" for '{k}'"))
        .unwrap_or_default()
}

impl Error {
    /// Creates a validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            key: None,
            message: message.into(),
        }
    }

    /// Creates a validation error for a permission key.
    pub fn validation_key<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Error::Validation {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// Whether this is a lost-update conflict on an admin write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Store(anw_store::Error::Conflict { .. }))
    }
}
