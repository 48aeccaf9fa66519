use async_trait::async_trait;
use fdrepo_schema::TrackedApp;

use crate::error::ProviderError;

/// One release record exactly as the provider returned it.
///
/// Records are deliberately untyped here; field extraction and tolerance of
/// missing or malformed fields happen in [`crate::select::normalize`].
pub type RawRelease = serde_json::Value;

/// A remote catalog that can list the releases of a tracked app.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the release records of `app`'s upstream project, newest first
    /// as far as the provider orders them.
    async fn fetch_releases(&self, app: &TrackedApp) -> Result<Vec<RawRelease>, ProviderError>;
}
