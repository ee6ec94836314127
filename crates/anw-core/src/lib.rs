//! ANW Core: shared errors, configuration, and normalization helpers.
//!
//! This crate has no internal ANW dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`config`]: Workspace configuration (`[store]`, `[identity]`, `[acl]`)
//! - [`util`]: Email and key normalization

pub mod config;
pub mod error;
pub mod util;

pub use config::{AclConfig, AnwConfig, IdentityConfig, StoreConfig, UnknownFeaturePolicy};
pub use error::{Error, Result};
pub use util::ids::{normalize_email, normalize_key};
