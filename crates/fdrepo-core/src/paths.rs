//! On-disk layout of a repository checkout.
//!
//! ```text
//! <root>/
//! ├── apps.yaml                 # tracked applications
//! ├── fdrepo.toml               # engine settings (optional)
//! ├── apks/<app-id>/            # retained artifacts per app
//! │   └── retained.json         # registry of the retained set
//! ├── fdroid/repo/              # flattened mirror read by the index builder
//! └── fdroid/metadata/<id>.yml  # per-app build descriptors
//! ```

use std::path::{Path, PathBuf};

use fdrepo_schema::AppId;

use crate::config::PathSettings;

/// Registry file recording the retained set inside each app directory.
pub const REGISTRY_FILE: &str = "retained.json";

/// Prefix of in-flight downloads inside an app directory.
pub const STAGING_PREFIX: &str = ".staging-";

/// Default app list filename.
pub const APPS_FILE: &str = "apps.yaml";

/// Default settings filename.
pub const SETTINGS_FILE: &str = "fdrepo.toml";

/// Resolved directories for one repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
    artifacts: PathBuf,
    mirror: Option<PathBuf>,
    metadata: PathBuf,
}

impl RepoLayout {
    /// Resolve the configured (possibly relative) paths against `root`.
    ///
    /// An empty mirror path disables the flattened mirror.
    pub fn new(root: impl Into<PathBuf>, paths: &PathSettings) -> Self {
        let root = root.into();
        let mirror = paths
            .mirror
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| root.join(p));
        Self {
            artifacts: root.join(&paths.artifacts),
            metadata: root.join(&paths.metadata),
            mirror,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of all per-app artifact directories: `<root>/apks`
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts
    }

    /// Flattened mirror: `<root>/fdroid/repo`
    pub fn mirror_dir(&self) -> Option<&Path> {
        self.mirror.as_deref()
    }

    /// Per-app artifact directory: `<root>/apks/<id>`
    pub fn app_dir(&self, app: &AppId) -> PathBuf {
        self.artifacts.join(app)
    }

    /// Retained registry: `<root>/apks/<id>/retained.json`
    pub fn registry_path(&self, app: &AppId) -> PathBuf {
        self.app_dir(app).join(REGISTRY_FILE)
    }

    /// Build descriptor for the index builder: `<root>/fdroid/metadata/<id>.yml`
    pub fn metadata_path(&self, app: &AppId) -> PathBuf {
        self.metadata.join(format!("{app}.yml"))
    }
}
