//! GitHub releases catalog.

use std::sync::Arc;

use async_trait::async_trait;
use fdrepo_schema::TrackedApp;
use reqwest::Client;
use reqwest::header::ACCEPT;
use tokio::sync::Semaphore;

use super::traits::{CatalogSource, RawRelease};
use crate::config::FetchSettings;
use crate::error::ProviderError;

/// A GitHub repository reference in `owner/repo` format.
///
/// # Example
///
/// ```
/// use fdrepo_core::forges::GitHubRepo;
///
/// let repo = GitHubRepo::from_url("https://github.com/owner/app.git").unwrap();
/// assert_eq!(repo.owner(), "owner");
/// assert_eq!(repo.name(), "app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitHubRepo {
    owner: String,
    name: String,
}

impl GitHubRepo {
    /// Parse a project location: a github.com URL (with or without scheme,
    /// `.git` suffix or trailing path) or a bare `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidSource`] for anything that is not a
    /// GitHub project.
    pub fn from_url(location: &str) -> Result<Self, ProviderError> {
        let invalid = || ProviderError::InvalidSource(location.to_string());
        let trimmed = location.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);

        let (path, shorthand) = match without_scheme
            .strip_prefix("github.com/")
            .or_else(|| without_scheme.strip_prefix("www.github.com/"))
        {
            Some(rest) => (rest, false),
            // A scheme pointing at any other host.
            None if without_scheme.len() != trimmed.len() => return Err(invalid()),
            None => (without_scheme, true),
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (owner, name) = match (shorthand, segments.as_slice()) {
            (true, [owner, name]) if !owner.contains('.') => (*owner, *name),
            (false, [owner, name, ..]) => (*owner, *name),
            _ => return Err(invalid()),
        };
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// [`CatalogSource`] backed by the GitHub REST API.
///
/// Holds the HTTP client and credentials; concurrent requests against the
/// API host are bounded by an internal semaphore shared by all clones.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    api_url: String,
    token: Option<String>,
    per_page: u32,
    limiter: Arc<Semaphore>,
}

impl GitHubSource {
    /// Create a source talking to `api_url` with an existing client.
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        let defaults = FetchSettings::default();
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            per_page: defaults.releases_per_page,
            limiter: Arc::new(Semaphore::new(defaults.max_requests_per_host)),
        }
    }

    /// Build a source (and its client) from the fetch settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_settings(
        settings: &FetchSettings,
        token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(settings.provider_timeout())
            .build()?;
        Ok(Self::new(client, settings.api_url.clone())
            .with_token(token)
            .with_per_page(settings.releases_per_page)
            .with_max_requests(settings.max_requests_per_host))
    }

    /// Authenticate requests with a bearer token. Blank tokens are ignored.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Number of releases requested per app.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    /// Upper bound of concurrent requests against the API host.
    #[must_use]
    pub fn with_max_requests(mut self, max: usize) -> Self {
        self.limiter = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Whether requests carry a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn releases_url(&self, repo: &GitHubRepo) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url,
            repo.owner(),
            repo.name()
        )
    }
}

#[async_trait]
impl CatalogSource for GitHubSource {
    async fn fetch_releases(&self, app: &TrackedApp) -> Result<Vec<RawRelease>, ProviderError> {
        let repo = GitHubRepo::from_url(&app.source_location)?;
        let url = self.releases_url(&repo);

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ProviderError::Decode("request limiter closed".into()))?;

        tracing::debug!("GET {url} (per_page={})", self.per_page);
        let mut request = self
            .client
            .get(&url)
            .query(&[("per_page", self.per_page)])
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url,
                status: status.as_u16(),
            });
        }

        match response.json::<serde_json::Value>().await? {
            serde_json::Value::Array(records) => Ok(records),
            other => Err(ProviderError::Decode(format!(
                "expected a list of releases from {url}, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
