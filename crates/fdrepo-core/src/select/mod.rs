//! Release selection pipeline.
//!
//! `normalize` → `channel` → `rank` → version code → `retention`. Every
//! step is pure; the engine owns all I/O.

/// Channel classification and recency ordering.
pub mod channel;
/// Provider records → releases.
pub mod normalize;
/// Asset ranking.
pub mod rank;
/// Bounded per-channel retention.
pub mod retention;

pub use channel::{candidates, recency_cmp};
pub use normalize::{NormalizeReport, normalize, normalize_record};
pub use rank::{select_asset, select_for_release};
pub use retention::{BuildState, PlannedBuild, RetentionPlan, RetentionPolicy};

use fdrepo_schema::{Channel, SelectedBuild, TrackedApp, version_code};
use serde_json::Value;

use crate::report::SkipReason;

/// The builds one app's catalog yields for its configured channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub channel: Channel,
    /// Releases that survived normalization.
    pub releases_considered: usize,
    /// Releases of the configured channel.
    pub candidates: usize,
    /// One build per candidate with a suitable asset, newest first.
    pub builds: Vec<SelectedBuild>,
    /// Candidate tags without a suitable asset.
    pub skipped_releases: Vec<String>,
}

impl Selection {
    /// Why nothing can be published, if that is the case.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if self.candidates == 0 {
            Some(SkipReason::NoEligibleRelease)
        } else if self.builds.is_empty() {
            Some(SkipReason::NoSuitableAsset)
        } else {
            None
        }
    }

    /// Lifecycle state of every candidate that was filtered out here.
    pub fn states(&self) -> impl Iterator<Item = (&str, BuildState)> {
        self.skipped_releases
            .iter()
            .map(|tag| (tag.as_str(), BuildState::Skipped(SkipReason::NoSuitableAsset)))
    }
}

/// Run the pure part of the pipeline over raw provider records.
pub fn select_builds(app: &TrackedApp, records: &[Value]) -> Selection {
    let normalized = normalize(records);
    let releases_considered = normalized.releases.len();
    let channel = app.channel();

    let candidates = channel::candidates(app.prefer_prerelease, normalized.releases);
    let mut builds = Vec::with_capacity(candidates.len());
    let mut skipped_releases = Vec::new();

    for release in &candidates {
        match select_for_release(release) {
            Ok(asset) => {
                let code = version_code::resolve(&release.tag);
                if version_code::is_fallback(&release.tag) {
                    tracing::debug!("{}: {} has no numeric component, code {code}", app.id, release.tag);
                }
                let build = SelectedBuild::new(&app.id, release, asset.clone(), code);
                tracing::debug!(
                    "{}: {} → {} ({})",
                    app.id,
                    release.tag,
                    build.output_name,
                    asset.name
                );
                builds.push(build);
            }
            Err(e) => {
                tracing::debug!("{}: {e}", app.id);
                skipped_releases.push(release.tag.clone());
            }
        }
    }

    Selection {
        channel,
        releases_considered,
        candidates: candidates.len(),
        builds,
        skipped_releases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn app(prefer_prerelease: bool) -> TrackedApp {
        TrackedApp {
            id: "org.example".into(),
            display_name: "Example".into(),
            source_location: "https://github.com/o/r".into(),
            prefer_prerelease,
            categories: BTreeSet::new(),
            author: None,
            archive: false,
        }
    }

    fn records() -> Vec<Value> {
        vec![
            json!({
                "tag_name": "v1.2.0",
                "published_at": "2024-02-01T00:00:00Z",
                "assets": [
                    {"name": "app-arm64-v8a.apk", "browser_download_url": "https://dl/120-arm64"},
                    {"name": "app-x86.apk", "browser_download_url": "https://dl/120-x86"}
                ]
            }),
            json!({
                "tag_name": "v1.1.0",
                "published_at": "2024-01-01T00:00:00Z",
                "assets": [{"name": "app-universal.apk", "browser_download_url": "https://dl/110"}]
            }),
            json!({
                "tag_name": "v1.0.9",
                "published_at": "2023-12-01T00:00:00Z",
                "assets": [{"name": "app-x86_64.apk", "browser_download_url": "https://dl/109"}]
            }),
        ]
    }

    #[test]
    fn test_stable_selection() {
        let selection = select_builds(&app(false), &records());
        assert_eq!(selection.skip_reason(), None);
        assert_eq!(selection.releases_considered, 3);
        assert_eq!(selection.candidates, 3);

        let summary: Vec<_> = selection
            .builds
            .iter()
            .map(|b| (b.version_code, b.output_name.as_str(), b.source_asset.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            [
                (2, "org.example_2.apk", "app-arm64-v8a.apk"),
                (1, "org.example_1.apk", "app-universal.apk"),
            ]
        );
        assert_eq!(selection.skipped_releases, ["v1.0.9"]);
        assert_eq!(selection.states().count(), 1);
    }

    #[test]
    fn test_prerelease_app_without_prereleases() {
        let selection = select_builds(&app(true), &records());
        assert_eq!(selection.skip_reason(), Some(SkipReason::NoEligibleRelease));
        assert!(selection.builds.is_empty());
    }

    #[test]
    fn test_no_suitable_asset() {
        let only_x86 = vec![json!({
            "tag_name": "v1",
            "assets": [{"name": "app-x86.apk", "browser_download_url": "u"}]
        })];
        let selection = select_builds(&app(false), &only_x86);
        assert_eq!(selection.skip_reason(), Some(SkipReason::NoSuitableAsset));
    }
}
