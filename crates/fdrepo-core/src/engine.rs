//! Run orchestration.
//!
//! For every tracked app: fetch the catalog, select builds, plan retention,
//! download what is missing and commit. Apps run on a bounded worker pool
//! and fail independently; a failed app leaves its stored state untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fdrepo_schema::{AppId, RetainedBuild, TrackedApp};
use futures::stream::{self, StreamExt};

use crate::config::{RetentionSettings, Settings};
use crate::error::{AppError, ProviderError};
use crate::forges::CatalogSource;
use crate::report::{AppOutcome, AppReport, RemovedApp, RunReport, SkipReason};
use crate::reporter::Reporter;
use crate::select::{PlannedBuild, RetentionPolicy, select_builds};
use crate::store::{AppCommit, ArtifactStore, StagedArtifact};

/// Knobs of one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub retention: RetentionSettings,
    /// Apps processed concurrently.
    pub workers: usize,
    /// Upper bound for one catalog request.
    pub provider_timeout: Duration,
    /// Plan only: nothing is downloaded, written or deleted.
    pub dry_run: bool,
    /// Stored apps that are not configured but must not be evicted.
    pub protected: Vec<AppId>,
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retention: settings.retention.clone(),
            workers: settings.fetch.workers,
            provider_timeout: settings.fetch.provider_timeout(),
            dry_run: false,
            protected: Vec::new(),
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn protect(mut self, ids: impl IntoIterator<Item = AppId>) -> Self {
        self.protected.extend(ids);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Cooperative cancellation shared between the engine and its caller.
///
/// Apps not yet started when the handle fires are reported as cancelled;
/// apps already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The release selection and retention engine.
pub struct Engine {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn ArtifactStore>,
    reporter: Arc<dyn Reporter>,
    options: EngineOptions,
    stop: StopHandle,
}

impl Engine {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn ArtifactStore>,
        reporter: Arc<dyn Reporter>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            store,
            reporter,
            options,
            stop: StopHandle::default(),
        }
    }

    /// Handle that stops scheduling new apps.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Process every configured app, then evict stored apps that are no
    /// longer configured. A cancelled run evicts nothing; a dry run only
    /// reports what it would evict.
    pub async fn run(&self, apps: &[TrackedApp]) -> RunReport {
        self.execute(apps, true).await
    }

    /// Process only the apps named in `only`. Removed apps are left alone.
    pub async fn run_only(&self, apps: &[TrackedApp], only: &[AppId]) -> RunReport {
        for id in only {
            if !apps.iter().any(|a| &a.id == id) {
                self.reporter.warning(&format!("{id} is not configured"));
            }
        }
        let selected: Vec<TrackedApp> = apps
            .iter()
            .filter(|a| only.contains(&a.id))
            .cloned()
            .collect();
        self.execute(&selected, false).await
    }

    async fn execute(&self, apps: &[TrackedApp], prune: bool) -> RunReport {
        let started = Instant::now();
        self.reporter.section(if self.options.dry_run {
            "Planning"
        } else {
            "Updating"
        });

        let mut results: Vec<(usize, AppReport)> = stream::iter(apps.iter().enumerate())
            .map(|(index, app)| async move {
                if self.stop.is_stopped() {
                    let report = AppReport::new(app.id.clone(), app.channel())
                        .skipped(SkipReason::Cancelled);
                    self.reporter.app_finished(&report);
                    return (index, report);
                }
                (index, self.process_app(app).await)
            })
            .buffer_unordered(self.options.workers.max(1))
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let cancelled = self.stop.is_stopped();
        let removed = if prune && !cancelled {
            self.prune_removed(apps).await
        } else {
            Vec::new()
        };

        let report = RunReport {
            apps: results.into_iter().map(|(_, report)| report).collect(),
            removed,
            cancelled,
            dry_run: self.options.dry_run,
            elapsed: started.elapsed(),
        };
        self.reporter.summary(&report);
        report
    }

    async fn process_app(&self, app: &TrackedApp) -> AppReport {
        self.reporter.app_started(&app.id, app.channel());
        let mut report = AppReport::new(app.id.clone(), app.channel());

        match self.try_process(app, &mut report).await {
            Ok(None) => {}
            Ok(Some(reason)) => report.outcome = AppOutcome::Skipped(reason),
            Err(e) => {
                tracing::warn!("{}: {e}", app.id);
                report.settle(false);
                report.outcome = AppOutcome::Failed(e.to_string());
            }
        }

        self.reporter.app_finished(&report);
        report
    }

    async fn try_process(
        &self,
        app: &TrackedApp,
        report: &mut AppReport,
    ) -> Result<Option<SkipReason>, AppError> {
        let timeout = self.options.provider_timeout;
        let records = tokio::time::timeout(timeout, self.source.fetch_releases(app))
            .await
            .map_err(|_| ProviderError::Timeout(timeout))??;

        let selection = select_builds(app, &records);
        report.releases_considered = selection.releases_considered;
        report.candidates = selection.candidates;
        report.skipped_releases.clone_from(&selection.skipped_releases);
        report.record(selection.states().map(|(tag, state)| (tag.to_string(), state)));
        if let Some(reason) = selection.skip_reason() {
            tracing::info!("{}: {reason}", app.id);
            return Ok(Some(reason));
        }

        let channel = selection.channel;
        let (retained, other_channel): (Vec<RetainedBuild>, Vec<RetainedBuild>) = self
            .store
            .scan(&app.id)
            .await?
            .into_iter()
            .partition(|r| r.build.channel == channel);

        let policy = RetentionPolicy::new(self.options.retention.depth(channel));
        let plan = policy.plan(channel, retained, selection.builds)?;
        report.record(plan.states());

        // A channel switch leaves the other channel's builds behind.
        let evict: Vec<String> = plan
            .evict
            .iter()
            .chain(&other_channel)
            .map(|r| r.build.output_name.clone())
            .collect();
        report.builds = plan.descriptor();

        if self.options.dry_run {
            report.fetched = plan.fetches().map(|b| b.output_name.clone()).collect();
            report.evicted = evict;
            return Ok(None);
        }

        let mut staged: Vec<StagedArtifact> = Vec::new();
        for build in plan.fetches() {
            self.reporter.fetching(&app.id, build);
            match self.store.stage(&app.id, build).await {
                Ok(artifact) => staged.push(artifact),
                // Dropping `staged` discards everything downloaded so far.
                Err(e) => return Err(e.into()),
            }
        }

        let retained: Vec<RetainedBuild> = plan
            .kept
            .iter()
            .map(|planned| match planned {
                PlannedBuild::Retained(r) => r.clone(),
                PlannedBuild::Fetch(build) => staged
                    .iter()
                    .find(|s| s.build.version_name == build.version_name)
                    .map_or_else(|| RetainedBuild::new(build.clone()), StagedArtifact::retained),
            })
            .collect();

        for name in &evict {
            self.reporter.evicting(&app.id, name);
        }

        let summary = self
            .store
            .commit(AppCommit {
                app: app.clone(),
                retained,
                staged,
                evict,
            })
            .await?;

        for name in &summary.leftovers {
            self.reporter
                .info(&format!("{}: removed unregistered {name}", app.id));
        }
        report.fetched = summary.written;
        report.evicted = summary.evicted;
        report.settle(true);
        Ok(None)
    }

    async fn prune_removed(&self, apps: &[TrackedApp]) -> Vec<RemovedApp> {
        let configured: HashSet<&str> = apps
            .iter()
            .map(|a| a.id.as_str())
            .chain(self.options.protected.iter().map(AppId::as_str))
            .collect();
        let stored = match self.store.stored_apps().await {
            Ok(stored) => stored,
            Err(e) => {
                self.reporter
                    .error(&format!("failed to list stored apps: {e}"));
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for app in stored
            .into_iter()
            .filter(|id| !configured.contains(id.as_str()))
        {
            if self.options.dry_run {
                self.reporter
                    .info(&format!("{app} is no longer configured and would be removed"));
                removed.push(RemovedApp {
                    app,
                    files: Vec::new(),
                });
                continue;
            }

            match self.store.evict_app(&app).await {
                Ok(files) => {
                    for file in &files {
                        self.reporter.evicting(&app, file);
                    }
                    tracing::info!("{app}: no longer configured, removed {} files", files.len());
                    removed.push(RemovedApp { app, files });
                }
                Err(e) => self.reporter.error(&format!("failed to remove {app}: {e}")),
            }
        }
        removed
    }
}
