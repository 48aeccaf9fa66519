//! Filesystem artifact store.
//!
//! Each app owns `apks/<id>/`, holding its retained artifacts and
//! `retained.json`. Retained artifacts are copied into the flattened mirror
//! read by `fdroid update`, and the build descriptor goes to
//! `metadata/<id>.yml`.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fdrepo_schema::{AppId, RetainedBuild, SelectedBuild, parse_output_name};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::metadata::AppMetadata;
use super::{AppCommit, ArtifactStore, CommitSummary, StagedArtifact};
use crate::config::FetchSettings;
use crate::error::StoreError;
use crate::paths::{REGISTRY_FILE, RepoLayout, STAGING_PREFIX};

#[derive(Debug, Default, Deserialize)]
struct Registry {
    #[serde(default)]
    builds: Vec<RetainedBuild>,
}

#[derive(Serialize)]
struct RegistryRef<'a> {
    builds: &'a [RetainedBuild],
}

/// [`ArtifactStore`] over a repository checkout.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    layout: RepoLayout,
    client: Client,
}

impl FsArtifactStore {
    pub fn new(layout: RepoLayout, client: Client) -> Self {
        Self { layout, client }
    }

    /// Build a store whose downloads are bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_settings(layout: RepoLayout, settings: &FetchSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(settings.download_timeout())
            .build()
            .map_err(StoreError::Client)?;
        Ok(Self::new(layout, client))
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// The registry of `app` as recorded, without checking the files.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry exists but cannot be read or parsed.
    pub async fn read_registry(&self, app: &AppId) -> Result<Vec<RetainedBuild>, StoreError> {
        let path = self.layout.registry_path(app);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let registry: Registry =
            serde_json::from_slice(&content).map_err(|e| StoreError::Registry {
                path,
                reason: e.to_string(),
            })?;
        Ok(registry.builds)
    }

    async fn write_registry(&self, app: &AppId, builds: &[RetainedBuild]) -> Result<(), StoreError> {
        let path = self.layout.registry_path(app);
        let content =
            serde_json::to_vec_pretty(&RegistryRef { builds }).map_err(|e| StoreError::Registry {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        write_atomic(&path, &content).await
    }

    /// Copy retained artifacts into the mirror and drop this app's stale
    /// mirror entries.
    async fn sync_mirror(
        &self,
        app: &AppId,
        keep: &HashSet<&str>,
        written: &[String],
    ) -> Result<(), StoreError> {
        let Some(mirror) = self.layout.mirror_dir() else {
            return Ok(());
        };
        fs::create_dir_all(mirror).await?;
        let dir = self.layout.app_dir(app);

        for name in keep {
            let src = dir.join(name);
            let dst = mirror.join(name);
            if written.iter().any(|w| w == name) || !same_size(&src, &dst).await? {
                fs::copy(&src, &dst).await?;
            }
        }

        for name in list_files(mirror).await? {
            if parse_output_name(app, &name).is_some() && !keep.contains(name.as_str()) {
                tracing::debug!("{app}: removing stale mirror entry {name}");
                remove_if_exists(&mirror.join(&name)).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn scan(&self, app: &AppId) -> Result<Vec<RetainedBuild>, StoreError> {
        let dir = self.layout.app_dir(app);
        let mut present = Vec::new();

        for mut build in self.read_registry(app).await? {
            match fs::metadata(dir.join(&build.build.output_name)).await {
                Ok(meta) => {
                    build.modified = meta.modified().ok().map(DateTime::<Utc>::from);
                    present.push(build);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(
                        "{app}: registered {} is missing, it will be fetched again",
                        build.build.output_name
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(present)
    }

    async fn stage(
        &self,
        app: &AppId,
        build: &SelectedBuild,
    ) -> Result<StagedArtifact, StoreError> {
        let dir = self.layout.app_dir(app);
        fs::create_dir_all(&dir).await?;

        let (file, path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".part")
            .tempfile_in(&dir)?
            .into_parts();
        let mut file = fs::File::from_std(file);

        let url = build.source_asset.download_url.clone();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StoreError::Fetch {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| StoreError::Fetch {
                url: url.clone(),
                source,
            })?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            size += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if size == 0 {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{url} returned an empty body"),
            )));
        }

        let sha256 = hex::encode(hasher.finalize());
        tracing::debug!(
            "{app}: staged {} ({size} bytes, sha256 {sha256})",
            build.output_name
        );
        Ok(StagedArtifact {
            build: build.clone(),
            sha256,
            path: Some(path),
        })
    }

    async fn commit(&self, commit: AppCommit) -> Result<CommitSummary, StoreError> {
        let AppCommit {
            app,
            retained,
            staged,
            evict,
        } = commit;
        let dir = self.layout.app_dir(&app.id);
        fs::create_dir_all(&dir).await?;
        let mut summary = CommitSummary::default();

        for artifact in staged {
            let name = artifact.build.output_name;
            let Some(path) = artifact.path else {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{name} was not staged on disk"),
                )));
            };
            path.persist(dir.join(&name)).map_err(|e| StoreError::Io(e.error))?;
            summary.written.push(name);
        }

        self.write_registry(&app.id, &retained).await?;

        let keep: HashSet<&str> = retained
            .iter()
            .map(|r| r.build.output_name.as_str())
            .collect();

        for name in evict {
            if keep.contains(name.as_str()) {
                continue;
            }
            if let Some(mirror) = self.layout.mirror_dir() {
                remove_if_exists(&mirror.join(&name)).await?;
            }
            if remove_if_exists(&dir.join(&name)).await? {
                summary.evicted.push(name);
            }
        }

        for name in list_files(&dir).await? {
            if name == REGISTRY_FILE || keep.contains(name.as_str()) {
                continue;
            }
            tracing::info!("{}: removing unregistered {name}", app.id);
            remove_if_exists(&dir.join(&name)).await?;
            summary.leftovers.push(name);
        }

        self.sync_mirror(&app.id, &keep, &summary.written).await?;

        let descriptors = retained.iter().map(|r| r.build.descriptor()).collect();
        let metadata = AppMetadata::new(&app, descriptors);
        let metadata_path = self.layout.metadata_path(&app.id);
        if let Some(parent) = metadata_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_atomic(&metadata_path, metadata.to_yaml()?.as_bytes()).await?;

        Ok(summary)
    }

    async fn stored_apps(&self) -> Result<Vec<AppId>, StoreError> {
        let mut entries = match fs::read_dir(self.layout.artifacts_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut apps = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                apps.push(AppId::new(name));
            }
        }
        apps.sort();
        Ok(apps)
    }

    async fn evict_app(&self, app: &AppId) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.app_dir(app);
        let mut removed = Vec::new();

        if fs::try_exists(&dir).await? {
            removed.extend(
                list_files(&dir)
                    .await?
                    .into_iter()
                    .filter(|name| name != REGISTRY_FILE),
            );
            fs::remove_dir_all(&dir).await?;
        }

        if let Some(mirror) = self.layout.mirror_dir() {
            for name in list_files(mirror).await? {
                if parse_output_name(app, &name).is_some() {
                    remove_if_exists(&mirror.join(&name)).await?;
                    if !removed.contains(&name) {
                        removed.push(name);
                    }
                }
            }
        }

        let metadata = self.layout.metadata_path(app);
        if remove_if_exists(&metadata).await? {
            removed.push(format!("{app}.yml"));
        }

        removed.sort();
        Ok(removed)
    }
}

/// Write through a sibling temp file so readers never see a partial file.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let mut temp: OsString = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    fs::write(&temp, content).await?;
    fs::rename(&temp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Regular files directly inside `dir`; a missing directory is empty.
async fn list_files(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

async fn same_size(a: &Path, b: &Path) -> Result<bool, StoreError> {
    let a = fs::metadata(a).await?;
    match fs::metadata(b).await {
        Ok(b) => Ok(a.len() == b.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathSettings;
    use fdrepo_schema::{Asset, Channel, Release, TrackedApp};
    use mockito::Server;
    use std::collections::BTreeSet;

    fn tracked(id: &str) -> TrackedApp {
        TrackedApp {
            id: id.into(),
            display_name: "Example".into(),
            source_location: "https://github.com/o/r".into(),
            prefer_prerelease: false,
            categories: BTreeSet::new(),
            author: None,
            archive: false,
        }
    }

    fn selected(app: &AppId, tag: &str, code: i32, url: String) -> SelectedBuild {
        let release = Release {
            tag: tag.into(),
            is_prerelease: false,
            published_at: None,
            assets: vec![],
        };
        SelectedBuild::new(app, &release, Asset::new("app.apk", url), code)
    }

    fn store(root: &Path) -> FsArtifactStore {
        FsArtifactStore::new(RepoLayout::new(root, &PathSettings::default()), Client::new())
    }

    async fn stage_and_commit(
        store: &FsArtifactStore,
        app: &TrackedApp,
        builds: &[SelectedBuild],
        evict: Vec<String>,
    ) -> CommitSummary {
        let mut staged = Vec::new();
        for build in builds {
            staged.push(store.stage(&app.id, build).await.unwrap());
        }
        let retained = staged.iter().map(StagedArtifact::retained).collect();
        store
            .commit(AppCommit {
                app: app.clone(),
                retained,
                staged,
                evict,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_stage_and_commit_publish_everything() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v2.apk")
            .with_status(200)
            .with_body("apk-bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let app = tracked("org.example");
        let build = selected(&app.id, "v1.2", 2, format!("{}/v2.apk", server.url()));

        let summary = stage_and_commit(&store, &app, &[build], vec![]).await;
        assert_eq!(summary.written, ["org.example_2.apk"]);

        let root = dir.path();
        assert_eq!(
            std::fs::read(root.join("apks/org.example/org.example_2.apk")).unwrap(),
            b"apk-bytes"
        );
        assert!(root.join("fdroid/repo/org.example_2.apk").exists());
        let metadata =
            std::fs::read_to_string(root.join("fdroid/metadata/org.example.yml")).unwrap();
        assert!(metadata.contains("CurrentVersionCode: 2"));

        let scanned = store.scan(&app.id).await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].build.version_name, "v1.2");
        assert_eq!(
            scanned[0].sha256.as_deref(),
            Some(hex::encode(Sha256::digest(b"apk-bytes")).as_str())
        );
        assert!(scanned[0].modified.is_some());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_behind() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/broken.apk")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let app = AppId::new("org.example");
        let build = selected(&app, "v1", 1, format!("{}/broken.apk", server.url()));

        let err = store.stage(&app, &build).await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 500, .. }));
        let leftovers = list_files(&dir.path().join("apks/org.example")).await.unwrap();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn test_commit_evicts_and_removes_leftovers() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/new.apk")
            .with_status(200)
            .with_body("new")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let store = store(root);
        let app = tracked("org.example");

        let app_dir = root.join("apks/org.example");
        let mirror = root.join("fdroid/repo");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::create_dir_all(&mirror).unwrap();
        for name in ["org.example_1.apk", "stray.apk", ".staging-abc.part"] {
            std::fs::write(app_dir.join(name), "old").unwrap();
        }
        std::fs::write(mirror.join("org.example_1.apk"), "old").unwrap();
        std::fs::write(mirror.join("org.other_1.apk"), "other").unwrap();

        let build = selected(&app.id, "v1.3", 3, format!("{}/new.apk", server.url()));
        let summary =
            stage_and_commit(&store, &app, &[build], vec!["org.example_1.apk".into()]).await;

        assert_eq!(summary.evicted, ["org.example_1.apk"]);
        let mut leftovers = summary.leftovers.clone();
        leftovers.sort();
        assert_eq!(leftovers, [".staging-abc.part", "stray.apk"]);
        assert_eq!(
            list_files(&app_dir).await.unwrap(),
            ["org.example_3.apk", REGISTRY_FILE]
        );
        assert_eq!(
            list_files(&mirror).await.unwrap(),
            ["org.example_3.apk", "org.other_1.apk"]
        );
    }

    #[tokio::test]
    async fn test_scan_drops_missing_files_and_rejects_corrupt_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let app = AppId::new("org.example");
        let ghost = RetainedBuild::new(selected(&app, "v1", 1, "u".into()));

        std::fs::create_dir_all(dir.path().join("apks/org.example")).unwrap();
        store.write_registry(&app, &[ghost]).await.unwrap();
        assert_eq!(store.read_registry(&app).await.unwrap().len(), 1);
        assert!(store.scan(&app).await.unwrap().is_empty());

        std::fs::write(store.layout().registry_path(&app), "{not json").unwrap();
        assert!(matches!(
            store.scan(&app).await,
            Err(StoreError::Registry { .. })
        ));
    }

    #[tokio::test]
    async fn test_evict_app_removes_every_trace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let store = store(root);

        for (path, body) in [
            ("apks/org.gone/org.gone_4.apk", "a"),
            ("apks/org.gone/retained.json", "{}"),
            ("apks/org.kept/org.kept_1.apk", "b"),
            ("fdroid/repo/org.gone_4.apk", "a"),
            ("fdroid/repo/org.gone_3_pre.apk", "a"),
            ("fdroid/repo/org.kept_1.apk", "b"),
            ("fdroid/metadata/org.gone.yml", "Name: Gone"),
        ] {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }

        let stored = store.stored_apps().await.unwrap();
        assert_eq!(stored, [AppId::new("org.gone"), AppId::new("org.kept")]);

        let removed = store.evict_app(&AppId::new("org.gone")).await.unwrap();
        assert_eq!(
            removed,
            ["org.gone.yml", "org.gone_3_pre.apk", "org.gone_4.apk"]
        );
        assert!(!root.join("apks/org.gone").exists());
        assert!(!root.join("fdroid/metadata/org.gone.yml").exists());
        assert_eq!(
            list_files(&root.join("fdroid/repo")).await.unwrap(),
            ["org.kept_1.apk"]
        );
        assert_eq!(store.stored_apps().await.unwrap(), [AppId::new("org.kept")]);
    }

    #[test]
    fn test_staged_artifact_becomes_retained() {
        let app = AppId::new("org.example");
        let artifact = StagedArtifact {
            build: selected(&app, "v1", 1, "u".into()),
            sha256: "ab".into(),
            path: None,
        };
        let retained = artifact.retained();
        assert_eq!(retained.sha256.as_deref(), Some("ab"));
        assert_eq!(retained.build.channel, Channel::Stable);
    }
}
