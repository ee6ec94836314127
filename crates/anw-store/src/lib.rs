//! # anw-store
//!
//! Client side of the ANW serverless key-value store.
//!
//! - [`KvBackend`]: the remote store collaborator, with an HTTP
//!   implementation ([`HttpKvBackend`]) and an in-process one
//!   ([`MemoryKvBackend`])
//! - [`KvClient`]: in-memory cache with synchronous reads, async
//!   fetch/save, dirty tracking and reconciliation
//! - [`StoreInitializer`]: TTL-bounded warm-up of the keys gating needs

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod client;
pub mod error;
pub mod http;
pub mod init;
pub mod memory;

pub use backend::{KvBackend, Versioned};
pub use client::{CacheEntry, KvClient};
pub use error::{Error, Result};
pub use http::HttpKvBackend;
pub use init::{InitReport, StoreInitializer};
pub use memory::MemoryKvBackend;
