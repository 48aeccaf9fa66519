//! Domain errors for the selection pipeline and its collaborators.

use std::path::PathBuf;
use std::time::Duration;

use fdrepo_schema::Channel;
use thiserror::Error;

/// Failures reported by a source catalog provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("unsupported source location '{0}'")]
    InvalidSource(String),

    #[error("malformed release record: {0}")]
    MalformedRecord(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// Asset selection failures for a single release.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("no suitable asset in release {tag}")]
    NoSuitableAsset { tag: String },
}

/// Violations of the retained-set invariants.
///
/// These indicate a naming collision that would corrupt the published
/// index, so the app is failed rather than silently overwritten.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetentionError {
    #[error("version code {code} claimed by both {first} and {second} in the {channel} channel")]
    DuplicateVersionCode {
        channel: Channel,
        code: i32,
        first: String,
        second: String,
    },

    #[error("{version} belongs to the {found} channel, not {expected}")]
    ChannelMismatch {
        version: String,
        expected: Channel,
        found: Channel,
    },
}

/// Failures at the artifact store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("download of {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("retained registry {path} is unreadable: {reason}")]
    Registry { path: PathBuf, reason: String },

    #[error("failed to write metadata: {0}")]
    Metadata(#[from] serde_yaml::Error),
}

/// Errors loading configuration; these abort the run before any app starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid app list: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Anything that aborts processing of one app (and only that app).
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Retention(#[from] RetentionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
