//! Artifact store boundary.
//!
//! The engine decides filenames, what to fetch and what to evict; a store
//! moves the bytes. A commit is all-or-nothing from the engine's point of
//! view: if any download of an app fails, its staged artifacts are dropped
//! and no commit happens.

/// Filesystem store (`apks/<id>/`, flattened mirror, metadata).
pub mod fs;
/// F-Droid metadata documents.
pub mod metadata;

pub use fs::FsArtifactStore;
pub use metadata::AppMetadata;

use async_trait::async_trait;
use fdrepo_schema::{AppId, RetainedBuild, SelectedBuild, TrackedApp};
use tempfile::TempPath;

use crate::error::StoreError;

/// A downloaded artifact waiting for its app's commit.
///
/// Dropping it before commit discards the staged bytes.
#[derive(Debug)]
pub struct StagedArtifact {
    pub build: SelectedBuild,
    /// Hex SHA-256 of the staged bytes.
    pub sha256: String,
    /// Temporary file holding the bytes, for stores that stage on disk.
    pub path: Option<TempPath>,
}

impl StagedArtifact {
    /// The retained entry this artifact becomes once committed.
    pub fn retained(&self) -> RetainedBuild {
        RetainedBuild {
            build: self.build.clone(),
            sha256: Some(self.sha256.clone()),
            modified: None,
        }
    }
}

/// Everything that changes for one app in one run.
#[derive(Debug)]
pub struct AppCommit {
    pub app: TrackedApp,
    /// The full retained set after this commit, newest first. Includes the
    /// entries of `staged`.
    pub retained: Vec<RetainedBuild>,
    /// New artifacts to move into place.
    pub staged: Vec<StagedArtifact>,
    /// Output filenames to delete.
    pub evict: Vec<String>,
}

/// What a commit actually did on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Output filenames written.
    pub written: Vec<String>,
    /// Output filenames deleted on request.
    pub evicted: Vec<String>,
    /// Unregistered files found and removed.
    pub leftovers: Vec<String>,
}

/// Storage for retained artifacts, one directory-like namespace per app.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// The builds currently retained for `app`, across both channels.
    async fn scan(&self, app: &AppId) -> Result<Vec<RetainedBuild>, StoreError>;

    /// Download `build` into a staging area.
    async fn stage(&self, app: &AppId, build: &SelectedBuild)
    -> Result<StagedArtifact, StoreError>;

    /// Apply one app's changes: persist staged artifacts, record the
    /// retained set, delete evicted and unregistered files and publish the
    /// descriptor.
    async fn commit(&self, commit: AppCommit) -> Result<CommitSummary, StoreError>;

    /// Apps that currently have anything stored.
    async fn stored_apps(&self) -> Result<Vec<AppId>, StoreError>;

    /// Remove everything stored for `app`. Returns the deleted filenames.
    async fn evict_app(&self, app: &AppId) -> Result<Vec<String>, StoreError>;
}
