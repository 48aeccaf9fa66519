//! Release catalog providers for code hosting platforms.

/// GitHub REST API adapter.
pub mod github;
/// Shared trait and types for catalog providers.
pub mod traits;

pub use github::{GitHubRepo, GitHubSource};
pub use traits::{CatalogSource, RawRelease};
