//! Status command: what is retained right now (offline)

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, Table};
use fdrepo_core::store::{ArtifactStore, FsArtifactStore};
use fdrepo_schema::{AppId, RetainedBuild, TrackedApp};

use crate::context::RepoContext;
use crate::ui::table::new_table;

/// Stored state of one configured app.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub app: TrackedApp,
    /// Retained builds, newest first.
    pub builds: Vec<RetainedBuild>,
    pub error: Option<String>,
}

impl StatusRow {
    fn current(&self) -> Option<&RetainedBuild> {
        self.builds.first()
    }

    fn label(&self) -> &'static str {
        if self.error.is_some() {
            "unreadable"
        } else if self.builds.is_empty() {
            "inactive"
        } else {
            "active"
        }
    }
}

fn retained_list(builds: &[RetainedBuild]) -> String {
    if builds.is_empty() {
        return "-".to_string();
    }
    builds
        .iter()
        .map(|b| b.build.version_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal table of configured apps and stored-but-unconfigured apps.
pub fn status_table(rows: &[StatusRow], orphans: &[AppId]) -> Table {
    let mut table = new_table(&["app", "channel", "current", "retained", "updated", "status"]);
    for row in rows {
        let current = row.current().map_or_else(
            || "-".to_string(),
            |b| format!("{} ({})", b.build.version_name, b.build.version_code),
        );
        let updated = row
            .current()
            .and_then(RetainedBuild::recency)
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string());
        let status = match &row.error {
            Some(e) => Cell::new(format!("{}: {e}", row.label())).fg(Color::Red),
            None if row.builds.is_empty() => Cell::new(row.label()).fg(Color::Yellow),
            None => Cell::new(row.label()).fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(&row.app.id),
            Cell::new(row.app.channel()),
            Cell::new(current),
            Cell::new(retained_list(&row.builds)),
            Cell::new(updated),
            status,
        ]);
    }
    for id in orphans {
        table.add_row(vec![
            Cell::new(id),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("not configured, removed on next update").fg(Color::DarkGrey),
        ]);
    }
    table
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// Markdown status page.
pub fn render_markdown(rows: &[StatusRow], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("# App Status\n\n");
    out.push_str("Builds currently published by this repository.\n\n");
    let _ = writeln!(out, "Last updated: {}\n", now.format("%Y-%m-%d %H:%M:%S UTC"));
    out.push_str("| App | Current Version | Source | Channel | Retained | Status |\n");
    out.push_str("|-----|-----------------|--------|---------|----------|--------|\n");
    for row in rows {
        let current = row
            .current()
            .map_or_else(|| "N/A".to_string(), |b| b.build.version_name.clone());
        let _ = writeln!(
            out,
            "| {} | {} | [{}]({}) | {} | {} | {} |",
            escape(&row.app.display_name),
            escape(&current),
            escape(&row.app.id),
            row.app.source_location,
            row.app.channel(),
            escape(&retained_list(&row.builds)),
            row.label(),
        );
    }
    out
}

/// Show retained builds per app, optionally writing a markdown page
pub async fn status(ctx: &RepoContext, markdown: Option<&Path>) -> Result<()> {
    let store = FsArtifactStore::from_settings(ctx.layout.clone(), &ctx.settings.fetch)
        .context("Failed to open the artifact store")?;

    let mut rows = Vec::with_capacity(ctx.apps().len());
    for app in ctx.apps() {
        let (builds, error) = match store.scan(&app.id).await {
            Ok(builds) => (builds, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };
        rows.push(StatusRow {
            app: app.clone(),
            builds,
            error,
        });
    }

    let orphans: Vec<AppId> = store
        .stored_apps()
        .await
        .context("Failed to list stored apps")?
        .into_iter()
        .filter(|id| !ctx.apps().iter().any(|a| &a.id == id))
        .collect();

    if rows.is_empty() && orphans.is_empty() {
        println!();
        println!("  No apps configured in {}.", ctx.apps_path.display());
    } else {
        println!();
        println!("{}", status_table(&rows, &orphans));
    }

    if let Some(path) = markdown {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, render_markdown(&rows, Utc::now()))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!();
        println!("  Status page written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fdrepo_schema::{Asset, Release, SelectedBuild};
    use std::collections::BTreeSet;

    fn app(id: &str, name: &str) -> TrackedApp {
        TrackedApp {
            id: id.into(),
            display_name: name.into(),
            source_location: format!("https://github.com/o/{id}"),
            prefer_prerelease: false,
            categories: BTreeSet::new(),
            author: None,
            archive: false,
        }
    }

    fn retained(app: &str, tag: &str, code: i32) -> RetainedBuild {
        let release = Release {
            tag: tag.into(),
            is_prerelease: false,
            published_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            assets: Vec::new(),
        };
        RetainedBuild::new(SelectedBuild::new(
            &AppId::new(app),
            &release,
            Asset::new("app.apk", "https://example.com/app.apk"),
            code,
        ))
    }

    fn rows() -> Vec<StatusRow> {
        vec![
            StatusRow {
                app: app("org.one", "One | Two"),
                builds: vec![retained("org.one", "v1.2.0", 2), retained("org.one", "v1.1.0", 1)],
                error: None,
            },
            StatusRow {
                app: app("org.empty", "Empty"),
                builds: Vec::new(),
                error: None,
            },
        ]
    }

    #[test]
    fn test_markdown_page() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 30, 0).unwrap();
        let page = render_markdown(&rows(), now);

        assert!(page.starts_with("# App Status\n"));
        assert!(page.contains("Last updated: 2026-10-01 12:30:00 UTC"));
        assert!(page.contains(
            "| One \\| Two | v1.2.0 | [org.one](https://github.com/o/org.one) | stable | v1.2.0, v1.1.0 | active |"
        ));
        assert!(page.contains("| Empty | N/A |"));
        assert!(page.contains("| - | inactive |"));
    }

    #[test]
    fn test_status_table_lists_orphans() {
        let rendered = status_table(&rows(), &[AppId::new("org.gone")]).to_string();
        assert!(rendered.contains("v1.2.0 (2)"));
        assert!(rendered.contains("2026-03-01"));
        assert!(rendered.contains("org.gone"));
        assert!(rendered.contains("not configured"));
    }
}
