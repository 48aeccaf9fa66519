//! Core data types shared across fdrepo crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Stable identifier of a tracked application (its Android package name).
///
/// Unlike a display name this is case-sensitive: `org.Foo` and `org.foo`
/// are different packages on a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct AppId(String);

impl AppId {
    /// Wrap an identifier, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self(id.trim().to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for AppId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for AppId {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for AppId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

/// Release channel of an application.
///
/// The two channels are never mixed: a retained set belongs to exactly one
/// channel and only receives builds from releases carrying the matching
/// prerelease flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Releases not flagged as prerelease upstream.
    Stable,
    /// Releases flagged as prerelease upstream.
    Prerelease,
}

impl Channel {
    /// Map an upstream prerelease flag to its channel.
    pub fn from_prerelease(prerelease: bool) -> Self {
        if prerelease {
            Self::Prerelease
        } else {
            Self::Stable
        }
    }

    /// Whether this is the prerelease channel.
    pub fn is_prerelease(self) -> bool {
        matches!(self, Self::Prerelease)
    }

    /// Output filename suffix for this channel (`""` or `"_pre"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Stable => "",
            Self::Prerelease => "_pre",
        }
    }

    /// Lowercase label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Prerelease => "prerelease",
        }
    }

    /// Both channels, stable first.
    pub const ALL: [Channel; 2] = [Channel::Stable, Channel::Prerelease];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Filename as published upstream (e.g. `app-arm64-v8a-release.apk`).
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
}

impl Asset {
    /// Create an asset from its name and download URL.
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }

    /// Lowercased extension of the filename, if it has one.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Whether the filename ends in the given extension, ignoring case.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().is_some_and(|e| e == ext.to_ascii_lowercase())
    }
}

/// A normalized upstream release.
///
/// Produced by the release normalizer; a `Release` always carries at least
/// one binary-package asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Upstream tag, used verbatim as the version name.
    pub tag: String,
    /// Upstream prerelease flag.
    pub is_prerelease: bool,
    /// Publication time reported by the provider, if any.
    pub published_at: Option<DateTime<Utc>>,
    /// Binary-package assets in provider order.
    pub assets: Vec<Asset>,
}

impl Release {
    /// The channel this release belongs to.
    pub fn channel(&self) -> Channel {
        Channel::from_prerelease(self.is_prerelease)
    }
}

/// One application tracked by the repository, after configuration adaption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedApp {
    /// Unique application identifier.
    pub id: AppId,
    /// Human-readable name shown in the repository.
    pub display_name: String,
    /// Upstream project location (e.g. `https://github.com/owner/repo`).
    pub source_location: String,
    /// Track the prerelease channel instead of the stable one.
    pub prefer_prerelease: bool,
    /// Repository categories.
    pub categories: BTreeSet<String>,
    /// Upstream author, when configured.
    pub author: Option<String>,
    /// Whether the app is archived (kept in the index, no longer current).
    pub archive: bool,
}

impl TrackedApp {
    /// The channel this app is configured to follow.
    pub fn channel(&self) -> Channel {
        Channel::from_prerelease(self.prefer_prerelease)
    }
}

/// The build chosen for one admitted release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedBuild {
    /// Human-readable version, equal to the release tag.
    pub version_name: String,
    /// Integer ordering key derived from the tag.
    pub version_code: i32,
    /// Asset chosen by the ranker.
    pub source_asset: Asset,
    /// Filename the artifact is stored under.
    pub output_name: String,
    /// Channel of the originating release.
    pub channel: Channel,
    /// Publication time of the originating release.
    pub published_at: Option<DateTime<Utc>>,
}

impl SelectedBuild {
    /// Build the selection for `release`, naming the output after `app`.
    pub fn new(app: &AppId, release: &Release, asset: Asset, version_code: i32) -> Self {
        let channel = release.channel();
        let ext = asset
            .extension()
            .unwrap_or_else(|| crate::PACKAGE_EXTENSION.to_string());
        Self {
            version_name: release.tag.clone(),
            version_code,
            output_name: output_name(app, version_code, channel, &ext),
            source_asset: asset,
            channel,
            published_at: release.published_at,
        }
    }

    /// The descriptor handed to the index builder for this build.
    pub fn descriptor(&self) -> BuildDescriptor {
        BuildDescriptor {
            version_name: self.version_name.clone(),
            version_code: self.version_code,
            commit: self.version_name.clone(),
            output: self.output_name.clone(),
            disable: false,
        }
    }
}

/// Deterministic artifact filename: `{app}_{code}[_pre].{ext}`.
///
/// # Example
///
/// ```
/// use fdrepo_schema::{AppId, Channel, output_name};
///
/// let id = AppId::new("org.example.app");
/// assert_eq!(output_name(&id, 42, Channel::Stable, "apk"), "org.example.app_42.apk");
/// assert_eq!(output_name(&id, 42, Channel::Prerelease, "apk"), "org.example.app_42_pre.apk");
/// ```
pub fn output_name(app: &AppId, version_code: i32, channel: Channel, ext: &str) -> String {
    format!("{app}_{version_code}{}.{ext}", channel.suffix())
}

/// Inverse of [`output_name`]: recover the version code and channel from a
/// filename produced for `app`.
///
/// Matching is strict (`{app}_{digits}[_pre].apk`), so a file of another
/// app whose id merely starts with `app` is never claimed.
///
/// # Example
///
/// ```
/// use fdrepo_schema::{AppId, Channel, parse_output_name};
///
/// let id = AppId::new("org.example");
/// assert_eq!(parse_output_name(&id, "org.example_7_pre.apk"), Some((7, Channel::Prerelease)));
/// assert_eq!(parse_output_name(&id, "org.example_extra_7.apk"), None);
/// ```
pub fn parse_output_name(app: &AppId, filename: &str) -> Option<(i32, Channel)> {
    let rest = filename.strip_prefix(app.as_str())?.strip_prefix('_')?;
    let (stem, ext) = rest.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case(crate::PACKAGE_EXTENSION) {
        return None;
    }
    let (digits, channel) = match stem.strip_suffix(Channel::Prerelease.suffix()) {
        Some(digits) => (digits, Channel::Prerelease),
        None => (stem, Channel::Stable),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|code| (code, channel))
}

/// A build that is currently materialized in the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedBuild {
    /// The selection that produced the artifact.
    #[serde(flatten)]
    pub build: SelectedBuild,
    /// Hex SHA-256 of the stored file, when the store recorded one.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Last modification time of the stored file.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl RetainedBuild {
    /// Wrap a selection that has just been materialized.
    pub fn new(build: SelectedBuild) -> Self {
        Self {
            build,
            sha256: None,
            modified: None,
        }
    }

    /// The publication time, or the file mtime when the provider never
    /// reported one. Retention only falls back to the mtime when there is no
    /// catalog to order against.
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.build.published_at.or(self.modified)
    }
}

/// Per-build record consumed by the index builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDescriptor {
    /// Human-readable version name.
    pub version_name: String,
    /// Integer version code.
    pub version_code: i32,
    /// Source reference; always the version name.
    pub commit: String,
    /// Artifact filename inside the repository.
    pub output: String,
    /// Whether the index builder should skip this build.
    pub disable: bool,
}

/// Newest-first ordering shared by channel classification and retention.
///
/// Entries with a timestamp come before entries without one; timestamps
/// sort descending; ties and undated entries fall back to descending
/// lexicographic tag order.
pub fn newest_first(
    a_at: Option<DateTime<Utc>>,
    a_tag: &str,
    b_at: Option<DateTime<Utc>>,
    b_tag: &str,
) -> Ordering {
    match (a_at, b_at) {
        (Some(a), Some(b)) => b.cmp(&a).then_with(|| b_tag.cmp(a_tag)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b_tag.cmp(a_tag),
    }
}
