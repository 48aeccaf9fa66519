//! Shared types for fdrepo.
//!
//! Everything in this crate is pure: no network, no disk. The engine in
//! `fdrepo-core` moves these values between the catalog provider, the
//! retention planner and the artifact store.

pub mod asset_pattern;
pub mod types;
pub mod version_code;

// Re-exports
pub use asset_pattern::{ArchClass, AssetPattern};
pub use types::*;

/// Extension (without the dot) of the binary packages this repository serves.
pub const PACKAGE_EXTENSION: &str = "apk";
