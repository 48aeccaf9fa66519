//! Reporter trait for dependency injection
//!
//! This trait allows the engine to report progress and status without
//! being coupled to a specific terminal implementation.

use fdrepo_schema::{AppId, Channel, SelectedBuild};

use crate::report::{AppReport, RunReport};

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Processing apps").
    fn section(&self, title: &str);

    /// An app has been scheduled on a worker.
    fn app_started(&self, app: &AppId, channel: Channel);

    /// A build is about to be downloaded.
    fn fetching(&self, app: &AppId, build: &SelectedBuild);

    /// A stored artifact is about to be removed.
    fn evicting(&self, app: &AppId, output: &str);

    /// An app finished, successfully or not.
    fn app_finished(&self, report: &AppReport);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of the run.
    fn summary(&self, report: &RunReport);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn app_started(&self, app: &AppId, channel: Channel) {
        (**self).app_started(app, channel);
    }
    fn fetching(&self, app: &AppId, build: &SelectedBuild) {
        (**self).fetching(app, build);
    }
    fn evicting(&self, app: &AppId, output: &str) {
        (**self).evicting(app, output);
    }
    fn app_finished(&self, report: &AppReport) {
        (**self).app_finished(report);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, report: &RunReport) {
        (**self).summary(report);
    }
}

/// A no-op reporter for silent operations (e.g., previews, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn app_started(&self, _: &AppId, _: Channel) {}
    fn fetching(&self, _: &AppId, _: &SelectedBuild) {}
    fn evicting(&self, _: &AppId, _: &str) {}
    fn app_finished(&self, _: &AppReport) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: &RunReport) {}
}
