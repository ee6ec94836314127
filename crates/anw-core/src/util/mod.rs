//! Utility modules shared across ANW crates.

pub mod ids;
