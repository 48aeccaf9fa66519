//! Per-app and per-run results surfaced to the caller.

use std::time::Duration;

use fdrepo_schema::{AppId, BuildDescriptor, Channel};
use serde::Serialize;

use crate::select::BuildState;

/// Why an app produced no new builds without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No release of the configured channel exists upstream.
    NoEligibleRelease,
    /// Releases exist but none carries an APK for a supported architecture.
    NoSuitableAsset,
    /// The run was stopped before this app was scheduled.
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoEligibleRelease => "no eligible release",
            Self::NoSuitableAsset => "no suitable asset",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Final state of one app after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum AppOutcome {
    Ok,
    Skipped(SkipReason),
    Failed(String),
}

/// Where one release version ended up this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStatus {
    pub version: String,
    pub state: BuildState,
}

/// What happened to one app.
#[derive(Debug, Clone, Serialize)]
pub struct AppReport {
    pub app: AppId,
    pub channel: Channel,
    /// Releases that survived normalization.
    pub releases_considered: usize,
    /// Releases of the configured channel.
    pub candidates: usize,
    /// Tags skipped because no asset qualified.
    pub skipped_releases: Vec<String>,
    /// Builds retained after this run, newest first.
    pub builds: Vec<BuildDescriptor>,
    /// Output filenames downloaded this run.
    pub fetched: Vec<String>,
    /// Output filenames removed this run.
    pub evicted: Vec<String>,
    /// Per-version lifecycle, selection rejects first, then the retained set
    /// newest first, then superseded candidates.
    pub states: Vec<BuildStatus>,
    pub outcome: AppOutcome,
}

impl AppReport {
    pub fn new(app: AppId, channel: Channel) -> Self {
        Self {
            app,
            channel,
            releases_considered: 0,
            candidates: 0,
            skipped_releases: Vec::new(),
            builds: Vec::new(),
            fetched: Vec::new(),
            evicted: Vec::new(),
            states: Vec::new(),
            outcome: AppOutcome::Ok,
        }
    }

    /// Append lifecycle states.
    pub fn record(&mut self, states: impl IntoIterator<Item = (String, BuildState)>) {
        for (version, state) in states {
            tracing::debug!("{}: {version} {state:?}", self.app);
            self.states.push(BuildStatus { version, state });
        }
    }

    /// Resolve pending fetches once the app committed (or did not).
    pub fn settle(&mut self, fetched: bool) {
        for status in &mut self.states {
            status.state = status.state.settle(fetched);
        }
    }

    pub fn skipped(mut self, reason: SkipReason) -> Self {
        self.outcome = AppOutcome::Skipped(reason);
        self
    }

    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AppOutcome::Failed(reason.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, AppOutcome::Failed(_))
    }
}

/// An app that was present in the store but no longer configured.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedApp {
    pub app: AppId,
    pub files: Vec<String>,
}

/// Result of one engine run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// One entry per processed app, in configuration order.
    pub apps: Vec<AppReport>,
    pub removed: Vec<RemovedApp>,
    pub cancelled: bool,
    pub dry_run: bool,
    pub elapsed: Duration,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&AppOutcome) -> bool) -> usize {
        self.apps.iter().filter(|a| pred(&a.outcome)).count()
    }

    pub fn ok_count(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Ok))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Skipped(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, AppOutcome::Failed(_)))
    }

    /// Every configured app was attempted (nothing left unscheduled).
    pub fn all_attempted(&self) -> bool {
        !self.cancelled
            && !self
                .apps
                .iter()
                .any(|a| a.outcome == AppOutcome::Skipped(SkipReason::Cancelled))
    }

    pub fn find(&self, app: &str) -> Option<&AppReport> {
        self.apps.iter().find(|a| a.app.as_str() == app)
    }
}
