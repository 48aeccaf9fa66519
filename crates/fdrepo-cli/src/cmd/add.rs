//! Add command: start tracking a GitHub project

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fdrepo_core::config::{append_app, parse_apps};
use fdrepo_core::forges::GitHubRepo;
use fdrepo_schema::{AppId, TrackedApp};
use regex::Regex;

use crate::AddArgs;

const DEFAULT_CATEGORY: &str = "Misc";

/// Files of an Android project that declare the package name, in lookup order.
const ID_SOURCES: [&str; 5] = [
    "app/build.gradle",
    "app/build.gradle.kts",
    "app/src/main/AndroidManifest.xml",
    "build.gradle",
    "build.gradle.kts",
];

/// Title-case a repository name: `fresh-app_tool` becomes `Fresh App Tool`.
pub fn display_name(repo: &str) -> String {
    repo.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The package name declared in an Android project checkout, if any.
pub async fn application_id(checkout: &Path) -> Result<Option<String>> {
    let gradle = Regex::new(r#"applicationId\s*=?\s*["']([^"']+)["']"#)?;
    let manifest = Regex::new(r#"package\s*=\s*["']([^"']+)["']"#)?;

    for file in ID_SOURCES {
        let path = checkout.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        let pattern = if file.ends_with(".xml") { &manifest } else { &gradle };
        if let Some(id) = pattern.captures(&content).and_then(|c| c.get(1)) {
            tracing::debug!("{}: package {}", path.display(), id.as_str());
            return Ok(Some(id.as_str().to_string()));
        }
    }
    Ok(None)
}

/// The app `args` describe. `detected` is the package name found in a checkout.
pub fn tracked_app(args: &AddArgs, detected: Option<String>) -> Result<TrackedApp> {
    let repo = GitHubRepo::from_url(&args.url)
        .with_context(|| format!("{} is not a GitHub project", args.url))?;
    let Some(id) = args
        .id
        .clone()
        .or(detected)
        .map(AppId::new)
        .filter(|id| !id.is_empty())
    else {
        bail!("no package name for {repo}: pass --id or --checkout");
    };

    let mut categories: BTreeSet<String> = args
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if categories.is_empty() {
        categories.insert(DEFAULT_CATEGORY.to_string());
    }

    Ok(TrackedApp {
        id,
        display_name: args
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| display_name(repo.name())),
        source_location: format!("https://github.com/{repo}"),
        prefer_prerelease: args.prerelease,
        categories,
        author: Some(repo.owner().to_string()),
        archive: args.archive,
    })
}

/// Append a new entry to the app list at `apps_path`
pub async fn add(apps_path: &Path, args: &AddArgs) -> Result<()> {
    let detected = match &args.checkout {
        Some(dir) => application_id(dir).await?,
        None => None,
    };
    let app = tracked_app(args, detected)?;

    if args.print {
        print!("{}", append_app("", &app)?);
        return Ok(());
    }

    let content = match tokio::fs::read_to_string(apps_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", apps_path.display()));
        }
    };
    let updated = append_app(&content, &app)
        .with_context(|| format!("Failed to add {} to {}", app.id, apps_path.display()))?;
    // The new entry must load the way `update` will load it.
    if !parse_apps(&updated)?.apps.iter().any(|a| a.id == app.id) {
        bail!("{} is not a valid package name", app.id);
    }
    tokio::fs::write(apps_path, updated)
        .await
        .with_context(|| format!("Failed to write {}", apps_path.display()))?;

    println!();
    println!(
        "  Added {} ({}) to {}",
        app.id,
        app.source_location,
        apps_path.display()
    );
    Ok(())
}
