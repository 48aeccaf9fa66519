use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fdrepo_schema::Channel;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine settings loaded from `fdrepo.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub retention: RetentionSettings,
    pub fetch: FetchSettings,
    pub paths: PathSettings,
}

/// Retention depth per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionSettings {
    /// Builds kept in the stable channel.
    pub stable: usize,
    /// Builds kept in the prerelease channel.
    pub prerelease: usize,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            stable: 2,
            prerelease: 2,
        }
    }
}

impl RetentionSettings {
    pub fn depth(&self, channel: Channel) -> usize {
        match channel {
            Channel::Stable => self.stable,
            Channel::Prerelease => self.prerelease,
        }
    }
}

/// Network and concurrency knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    /// Apps processed concurrently.
    pub workers: usize,
    /// Upper bound for one catalog request.
    pub provider_timeout_secs: u64,
    /// Upper bound for one artifact download.
    pub download_timeout_secs: u64,
    /// Concurrent requests allowed against the provider host.
    pub max_requests_per_host: usize,
    /// Releases requested per app.
    pub releases_per_page: u32,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            provider_timeout_secs: 30,
            download_timeout_secs: 300,
            max_requests_per_host: 4,
            releases_per_page: 30,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl FetchSettings {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Repository-relative directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub artifacts: PathBuf,
    /// Flattened mirror directory; empty disables it.
    pub mirror: Option<PathBuf>,
    pub metadata: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("apks"),
            mirror: Some(PathBuf::from("fdroid/repo")),
            metadata: PathBuf::from("fdroid/metadata"),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid
    /// TOML, or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or out-of-range values.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            if self.retention.depth(channel) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "retention.{channel} must be at least 1"
                )));
            }
        }
        if self.fetch.workers == 0 {
            return Err(ConfigError::Invalid("fetch.workers must be at least 1".into()));
        }
        if self.fetch.max_requests_per_host == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_requests_per_host must be at least 1".into(),
            ));
        }
        if self.fetch.provider_timeout_secs == 0 || self.fetch.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
