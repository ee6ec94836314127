//! # anw-acl
//!
//! Role-based access control for the Aderrig Neighbourhood Watch site.
//!
//! This crate implements:
//! - [`Role`] and the member [`UserDirectory`]
//! - session resolution ([`SessionResolver`], [`resolve_role`])
//! - the ACL matrix ([`AclMatrix`], [`Rule`])
//! - the evaluator ([`allows`]) and its three consumers in [`gate`]
//! - the page model ([`page`]) and an HTML scanner ([`scan`])
//! - page-load orchestration and ACL administration ([`AclGuard`])

#![forbid(unsafe_code)]

pub mod directory;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod guard;
pub mod matrix;
pub mod page;
pub mod role;
pub mod scan;
pub mod session;

pub use directory::{DirectoryEntry, UserDirectory, UserRecord, UserStatus};
pub use error::{Error, Result};
pub use evaluator::{AccessContext, Decision, allows};
pub use gate::{GateOutcome, PageDecision};
pub use guard::AclGuard;
pub use matrix::{AclMatrix, PageLabel, Rule};
pub use page::{
    ElementKind, FeatureElement, NavLink, Navigator, PageDocument, RecordingNavigator, Routes,
};
pub use role::Role;
pub use session::{Session, SessionResolver, resolve_role};

#[cfg(test)]
mod proptests;
