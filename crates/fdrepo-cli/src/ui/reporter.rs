//! Terminal implementation of the engine's [`Reporter`].
//!
//! Workers report concurrently; every event is a single line written under
//! the stream lock, so lines never interleave.

use std::io::Write;

use crossterm::style::Stylize;
use fdrepo_core::{AppOutcome, AppReport, Reporter, RunReport};
use fdrepo_schema::{AppId, Channel, SelectedBuild};

use super::table::run_table;

/// Where progress lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stdout,
    /// Keeps stdout clean for machine-readable output.
    Stderr,
}

#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    target: Target,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(Target::Stdout)
    }
}

impl ConsoleReporter {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    fn line(&self, text: &str) {
        // A closed pipe is not worth failing a run over.
        let _ = match self.target {
            Target::Stdout => writeln!(std::io::stdout().lock(), "{text}"),
            Target::Stderr => writeln!(std::io::stderr().lock(), "{text}"),
        };
    }
}

/// One-line description of a finished app.
pub fn finished_line(report: &AppReport) -> String {
    let id = format!("{:<32}", report.app.as_str());
    match &report.outcome {
        AppOutcome::Ok => {
            let current = report
                .builds
                .first()
                .map_or_else(String::new, |b| b.version_name.clone());
            let mut detail = format!("{current} ({} kept", report.builds.len());
            if !report.fetched.is_empty() {
                detail.push_str(&format!(", {} new", report.fetched.len()));
            }
            if !report.evicted.is_empty() {
                detail.push_str(&format!(", {} evicted", report.evicted.len()));
            }
            detail.push(')');
            format!("  {} {id} {}", "✓".green(), detail.dark_grey())
        }
        AppOutcome::Skipped(reason) => {
            format!("  {} {id} {}", "·".dark_grey(), reason.to_string().yellow())
        }
        AppOutcome::Failed(reason) => format!("  {} {id} {}", "✗".red(), reason.as_str().red()),
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        self.line("");
        self.line(&title.dark_grey().to_string());
    }

    fn app_started(&self, app: &AppId, channel: Channel) {
        tracing::debug!("{app}: checking {channel} releases");
    }

    fn fetching(&self, app: &AppId, build: &SelectedBuild) {
        self.line(&format!(
            "  {} {:<32} {} {}",
            "↓".cyan(),
            app.as_str(),
            build.version_name,
            build.source_asset.name.as_str().dark_grey()
        ));
    }

    fn evicting(&self, app: &AppId, output: &str) {
        self.line(&format!("  {} {:<32} {}", "-".dark_grey(), app.as_str(), output.dark_grey()));
    }

    fn app_finished(&self, report: &AppReport) {
        self.line(&finished_line(report));
    }

    fn info(&self, msg: &str) {
        self.line(&format!("  {}", msg.dark_grey()));
    }

    fn warning(&self, msg: &str) {
        self.line(&format!("  {} {msg}", "warning:".yellow()));
    }

    fn error(&self, msg: &str) {
        self.line(&format!("  {} {msg}", "error:".red()));
    }

    fn summary(&self, report: &RunReport) {
        self.line("");
        if !report.apps.is_empty() || !report.removed.is_empty() {
            self.line(&run_table(report).to_string());
            self.line("");
        }

        let mut totals = format!(
            "{} ok, {} skipped, {} failed in {:.1}s",
            report.ok_count(),
            report.skipped_count(),
            report.failed_count(),
            report.elapsed.as_secs_f64()
        );
        if report.dry_run {
            totals.push_str(" (dry run, nothing changed)");
        }
        self.line(&totals.dark_grey().to_string());
        if report.cancelled {
            self.line(&"Run cancelled before every app was attempted".yellow().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdrepo_core::SkipReason;
    use fdrepo_schema::BuildDescriptor;

    #[test]
    fn test_finished_line_counts() {
        let mut report = AppReport::new("org.example".into(), Channel::Stable);
        report.builds = vec![BuildDescriptor {
            version_name: "v1.2.0".into(),
            version_code: 2,
            commit: "v1.2.0".into(),
            output: "org.example_2.apk".into(),
            disable: false,
        }];
        report.fetched = vec!["org.example_2.apk".into()];

        let line = finished_line(&report);
        assert!(line.contains("org.example"));
        assert!(line.contains("v1.2.0 (1 kept, 1 new)"));
        assert!(!line.contains("evicted"));
    }

    #[test]
    fn test_finished_line_skip_and_failure() {
        let skipped = AppReport::new("org.a".into(), Channel::Prerelease)
            .skipped(SkipReason::NoSuitableAsset);
        assert!(finished_line(&skipped).contains("no suitable asset"));

        let failed = AppReport::new("org.b".into(), Channel::Stable).failed("timed out");
        assert!(finished_line(&failed).contains("timed out"));
    }
}
