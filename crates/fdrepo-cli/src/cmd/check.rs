//! Check command: what would `update` publish?

use anyhow::{Context, Result};
use comfy_table::{Cell, Color};
use fdrepo_core::forges::{CatalogSource, GitHubSource};
use fdrepo_core::select::{Selection, select_builds};
use fdrepo_core::store::FsArtifactStore;
use fdrepo_core::SkipReason;
use fdrepo_schema::{RetainedBuild, TrackedApp};
use futures::stream::{self, StreamExt};

use crate::context::{RepoContext, parse_only};
use crate::ui::table::new_table;
use crate::{CheckArgs, resolve_token};

/// How the selection for one app compares to what is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    UpToDate,
    /// Builds that would be downloaded.
    Updates(Vec<String>),
    Skipped(SkipReason),
    Failed(String),
}

/// Compare the newest `depth` selected builds against the stored set.
pub fn compare(selection: &Selection, depth: usize, stored: &[RetainedBuild]) -> CheckStatus {
    if let Some(reason) = selection.skip_reason() {
        return CheckStatus::Skipped(reason);
    }
    let missing: Vec<String> = selection
        .builds
        .iter()
        .take(depth)
        .filter(|b| !stored.iter().any(|s| s.build.version_name == b.version_name))
        .map(|b| b.version_name.clone())
        .collect();
    if missing.is_empty() {
        CheckStatus::UpToDate
    } else {
        CheckStatus::Updates(missing)
    }
}

impl CheckStatus {
    fn cell(&self) -> Cell {
        match self {
            Self::UpToDate => Cell::new("up to date").fg(Color::Green),
            Self::Updates(tags) => Cell::new(format!("new: {}", tags.join(", "))).fg(Color::Cyan),
            Self::Skipped(reason) => Cell::new(reason).fg(Color::Yellow),
            Self::Failed(reason) => Cell::new(format!("failed: {reason}")).fg(Color::Red),
        }
    }
}

/// Query the provider for each app and print the builds it would keep
pub async fn check(ctx: &RepoContext, args: &CheckArgs) -> Result<()> {
    let fetch = &ctx.settings.fetch;
    let source = GitHubSource::from_settings(fetch, resolve_token(args.token.as_deref()))
        .context("Failed to set up the GitHub client")?;
    let store = FsArtifactStore::from_settings(ctx.layout.clone(), fetch)
        .context("Failed to set up the artifact store")?;

    let only = parse_only(&args.only);
    let apps = ctx.filtered(&only);
    if apps.is_empty() {
        println!();
        println!("  No apps to check.");
        return Ok(());
    }

    let timeout = fetch.provider_timeout();
    let rows: Vec<(&TrackedApp, Option<Selection>, CheckStatus)> = stream::iter(apps)
        .map(|app| {
            let source = &source;
            let store = &store;
            async move {
                let records = match tokio::time::timeout(timeout, source.fetch_releases(app)).await {
                    Ok(Ok(records)) => records,
                    Ok(Err(e)) => return (app, None, CheckStatus::Failed(e.to_string())),
                    Err(_) => return (app, None, CheckStatus::Failed("timed out".to_string())),
                };
                let selection = select_builds(app, &records);
                let stored = match store.read_registry(&app.id).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        tracing::warn!("{}: {e}", app.id);
                        Vec::new()
                    }
                };
                let depth = ctx.settings.retention.depth(app.channel());
                let status = compare(&selection, depth, &stored);
                (app, Some(selection), status)
            }
        })
        .buffered(fetch.workers.max(1))
        .collect()
        .await;

    let mut table = new_table(&["app", "channel", "would keep", "asset", "status"]);
    for (app, selection, status) in &rows {
        let depth = ctx.settings.retention.depth(app.channel());
        let builds = selection.as_ref().map(|s| &s.builds[..s.builds.len().min(depth)]);
        let keep = builds.map_or_else(
            || "-".to_string(),
            |b| {
                b.iter()
                    .map(|b| format!("{} ({})", b.version_name, b.version_code))
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );
        let asset = builds
            .and_then(<[_]>::first)
            .map_or_else(|| "-".to_string(), |b| b.source_asset.name.clone());
        table.add_row(vec![
            Cell::new(&app.id),
            Cell::new(app.channel()),
            Cell::new(if keep.is_empty() { "-".to_string() } else { keep }),
            Cell::new(asset),
            status.cell(),
        ]);
    }

    println!();
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdrepo_schema::{AppId, Asset, Channel, Release, SelectedBuild};

    fn build(tag: &str, code: i32) -> SelectedBuild {
        let release = Release {
            tag: tag.into(),
            is_prerelease: false,
            published_at: None,
            assets: Vec::new(),
        };
        SelectedBuild::new(
            &AppId::new("org.example"),
            &release,
            Asset::new("app.apk", "https://example.com/app.apk"),
            code,
        )
    }

    fn selection(builds: Vec<SelectedBuild>) -> Selection {
        Selection {
            channel: Channel::Stable,
            releases_considered: builds.len(),
            candidates: builds.len(),
            builds,
            skipped_releases: Vec::new(),
        }
    }

    #[test]
    fn test_compare_only_looks_at_retained_depth() {
        let sel = selection(vec![build("v1.3", 3), build("v1.2", 2), build("v1.1", 1)]);
        let stored = vec![RetainedBuild::new(build("v1.2", 2))];

        assert_eq!(
            compare(&sel, 2, &stored),
            CheckStatus::Updates(vec!["v1.3".to_string()])
        );
        let stored = vec![
            RetainedBuild::new(build("v1.3", 3)),
            RetainedBuild::new(build("v1.2", 2)),
        ];
        assert_eq!(compare(&sel, 2, &stored), CheckStatus::UpToDate);
    }

    #[test]
    fn test_compare_matches_on_tag() {
        // Same version code, and so the same output file, but a new tag.
        let sel = selection(vec![build("v2.2", 2)]);
        let stored = vec![RetainedBuild::new(build("v1.2", 2))];
        assert_eq!(
            compare(&sel, 1, &stored),
            CheckStatus::Updates(vec!["v2.2".to_string()])
        );
    }

    #[test]
    fn test_compare_reports_skip_reason() {
        let empty = Selection {
            channel: Channel::Prerelease,
            releases_considered: 3,
            candidates: 0,
            builds: Vec::new(),
            skipped_releases: Vec::new(),
        };
        assert_eq!(
            compare(&empty, 2, &[]),
            CheckStatus::Skipped(SkipReason::NoEligibleRelease)
        );
    }
}
