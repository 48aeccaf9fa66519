use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use fdrepo_schema::{AppId, TrackedApp};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;

/// One raw entry of `apps.yaml`.
///
/// Older lists put `prefer_prerelease` and `categories` at the top level of
/// an entry, newer ones nest them under `fdroid:`. Both are accepted; the
/// nested value wins when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub prefer_prerelease: Option<bool>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub archive: Option<bool>,
    pub fdroid: Option<FdroidSection>,
}

/// The nested `fdroid:` block of an entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FdroidSection {
    pub prefer_prerelease: Option<bool>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub archive: Option<bool>,
}

impl AppEntry {
    /// Adapt this entry into the single normalized app shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `id` or `url` is missing or blank,
    /// or if `id` could escape the artifact directory.
    pub fn into_tracked_app(self) -> Result<TrackedApp, ConfigError> {
        let id = self
            .id
            .map(AppId::new)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::Invalid("entry has no id".into()))?;
        // The id names a directory and a file prefix in the repository.
        if id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ConfigError::Invalid(format!("{id}: id is not a package name")));
        }
        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::Invalid(format!("{id}: entry has no url")))?;

        let fdroid = self.fdroid.unwrap_or_default();
        let categories: BTreeSet<String> = fdroid
            .categories
            .into_iter()
            .chain(self.categories)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(TrackedApp {
            display_name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| id.to_string()),
            prefer_prerelease: fdroid
                .prefer_prerelease
                .or(self.prefer_prerelease)
                .unwrap_or(false),
            archive: fdroid.archive.or(self.archive).unwrap_or(false),
            author: self.author.filter(|a| !a.trim().is_empty()),
            source_location: url,
            categories,
            id,
        })
    }
}

/// Result of adapting an app list.
#[derive(Debug, Clone, Default)]
pub struct LoadedApps {
    /// Valid, uniquely identified apps in document order.
    pub apps: Vec<TrackedApp>,
    /// Human-readable reasons for every rejected entry.
    pub rejected: Vec<String>,
    /// Ids still readable from rejected entries. Their stored builds must
    /// survive pruning until the entry is fixed.
    pub protected: Vec<AppId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AppsDocument {
    Wrapped {
        #[serde(default)]
        apps: Option<Vec<serde_yaml::Value>>,
    },
    Bare(Vec<serde_yaml::Value>),
}

/// Parse an app list document.
///
/// The document is either `{apps: [...]}` or a bare list. Each entry is
/// adapted independently: a broken entry is rejected with a warning and the
/// rest of the list still loads. Duplicate ids keep the first entry.
///
/// # Errors
///
/// Returns an error only when the document itself is not a list of entries.
pub fn parse_apps(content: &str) -> Result<LoadedApps, ConfigError> {
    if content.trim().is_empty() {
        return Ok(LoadedApps::default());
    }
    let entries = match serde_yaml::from_str::<Option<AppsDocument>>(content)? {
        Some(AppsDocument::Wrapped { apps }) => apps.unwrap_or_default(),
        Some(AppsDocument::Bare(apps)) => apps,
        None => Vec::new(),
    };

    let mut loaded = LoadedApps::default();
    let mut seen = HashSet::new();

    for (index, value) in entries.into_iter().enumerate() {
        let raw_id = value
            .get("id")
            .and_then(Value::as_str)
            .map(AppId::new)
            .filter(|id| !id.is_empty());
        let adapted = serde_yaml::from_value::<AppEntry>(value)
            .map_err(ConfigError::from)
            .and_then(AppEntry::into_tracked_app);

        match adapted {
            Ok(app) if !seen.insert(app.id.clone()) => {
                let reason = format!("entry {index}: duplicate id {}", app.id);
                tracing::warn!("{reason}");
                loaded.rejected.push(reason);
            }
            Ok(app) => loaded.apps.push(app),
            Err(e) => {
                let reason = format!("entry {index}: {e}");
                tracing::warn!("{reason}");
                loaded.rejected.push(reason);
                loaded.protected.extend(raw_id);
            }
        }
    }

    Ok(loaded)
}

/// Read and parse the app list at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a list of entries.
pub fn load_apps(path: &Path) -> Result<LoadedApps, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_apps(&content)
}

#[derive(Serialize)]
struct NewEntry<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    url: &'a str,
    fdroid: NewFdroidSection<'a>,
}

#[derive(Serialize)]
struct NewFdroidSection<'a> {
    categories: Vec<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    prefer_prerelease: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    archive: bool,
}

/// `app` as an app list entry, in the nested shape.
fn to_entry(app: &TrackedApp) -> Result<Value, ConfigError> {
    let entry = NewEntry {
        id: app.id.as_str(),
        name: &app.display_name,
        author: app.author.as_deref(),
        url: &app.source_location,
        fdroid: NewFdroidSection {
            categories: app.categories.iter().map(String::as_str).collect(),
            prefer_prerelease: app.prefer_prerelease,
            archive: app.archive,
        },
    };
    Ok(serde_yaml::to_value(entry)?)
}

/// Append `app` to an app list document and return the new document.
///
/// Other top-level keys and the fields of existing entries are kept as they
/// are; comments and formatting are not.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the id is already listed or the
/// document is neither `{apps: [...]}` nor a bare list.
pub fn append_app(content: &str, app: &TrackedApp) -> Result<String, ConfigError> {
    let mut doc: Value = if content.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(content)?
    };
    if doc.is_null() {
        let mut root = serde_yaml::Mapping::new();
        root.insert("apps".into(), Value::Sequence(Vec::new()));
        doc = Value::Mapping(root);
    }

    let list = match &mut doc {
        Value::Sequence(list) => list,
        Value::Mapping(root) => {
            let apps = root
                .entry("apps".into())
                .or_insert_with(|| Value::Sequence(Vec::new()));
            if apps.is_null() {
                *apps = Value::Sequence(Vec::new());
            }
            apps.as_sequence_mut()
                .ok_or_else(|| ConfigError::Invalid("`apps` is not a list".into()))?
        }
        _ => return Err(ConfigError::Invalid("app list is not a list of entries".into())),
    };

    let taken = list.iter().any(|entry| {
        entry
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| AppId::new(id) == app.id)
    });
    if taken {
        return Err(ConfigError::Invalid(format!("{} is already tracked", app.id)));
    }

    list.push(to_entry(app)?);
    Ok(serde_yaml::to_string(&doc)?)
}
