//! The remote KV store collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// A stored value together with the backend's version tag (ETag), if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    /// The whole stored value.
    pub value: Value,
    /// Opaque version tag used for conditional writes.
    pub version: Option<String>,
}

/// Durable storage keyed by string, read and written by whole-value replace.
///
/// `token` is the caller's bearer token; `None` means an anonymous request,
/// and the backend alone decides whether the key is readable without one.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read a key. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str, token: Option<&str>) -> Result<Option<Versioned>>;

    /// Replace a key's value. With `if_match`, the write only succeeds if the
    /// stored version still equals it. Returns the new version, if known.
    async fn put(
        &self,
        key: &str,
        value: &Value,
        token: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<Option<String>>;

    /// Remove a key.
    async fn delete(&self, key: &str, token: Option<&str>) -> Result<()>;
}
