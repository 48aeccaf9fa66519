//! Summary tables
//!
//! Rendered once at the end of a command, so plain `comfy-table` output is
//! enough; no live redraw.

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use fdrepo_core::{AppOutcome, AppReport, RunReport};

/// An empty table with the house style.
pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::DarkGrey)));
    table
}

/// Short status word and its color.
pub fn outcome_label(outcome: &AppOutcome) -> (String, Color) {
    match outcome {
        AppOutcome::Ok => ("ok".to_string(), Color::Green),
        AppOutcome::Skipped(reason) => (reason.to_string(), Color::Yellow),
        AppOutcome::Failed(reason) => (format!("failed: {reason}"), Color::Red),
    }
}

fn current(app: &AppReport) -> String {
    app.builds
        .first()
        .map_or_else(|| "-".to_string(), |b| format!("{} ({})", b.version_name, b.version_code))
}

fn count(n: usize) -> String {
    if n == 0 { "-".to_string() } else { n.to_string() }
}

/// One row per app of a run.
pub fn run_table(report: &RunReport) -> Table {
    let mut table = new_table(&["app", "channel", "current", "kept", "fetched", "evicted", "status"]);
    for app in &report.apps {
        let (status, color) = outcome_label(&app.outcome);
        table.add_row(vec![
            Cell::new(&app.app),
            Cell::new(app.channel),
            Cell::new(current(app)),
            Cell::new(count(app.builds.len())),
            Cell::new(count(app.fetched.len())),
            Cell::new(count(app.evicted.len())),
            Cell::new(status).fg(color),
        ]);
    }
    for removed in &report.removed {
        table.add_row(vec![
            Cell::new(&removed.app),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(count(removed.files.len())),
            Cell::new("removed").fg(Color::DarkGrey),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdrepo_core::{RemovedApp, SkipReason};
    use fdrepo_schema::{BuildDescriptor, Channel};
    use std::time::Duration;

    fn report() -> RunReport {
        let mut ok = AppReport::new("org.ok".into(), Channel::Stable);
        ok.builds = vec![BuildDescriptor {
            version_name: "v1.2.0".into(),
            version_code: 2,
            commit: "v1.2.0".into(),
            output: "org.ok_2.apk".into(),
            disable: false,
        }];
        ok.fetched = vec!["org.ok_2.apk".into()];
        RunReport {
            apps: vec![
                ok,
                AppReport::new("org.pre".into(), Channel::Prerelease)
                    .skipped(SkipReason::NoEligibleRelease),
                AppReport::new("org.bad".into(), Channel::Stable).failed("HTTP 404"),
            ],
            removed: vec![RemovedApp {
                app: "org.gone".into(),
                files: vec!["org.gone_1.apk".into()],
            }],
            cancelled: false,
            dry_run: false,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_run_table_rows() {
        let rendered = run_table(&report()).to_string();
        assert!(rendered.contains("v1.2.0 (2)"));
        assert!(rendered.contains("no eligible release"));
        assert!(rendered.contains("failed: HTTP 404"));
        assert!(rendered.contains("org.gone"));
        assert!(rendered.contains("removed"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&AppOutcome::Ok).0, "ok");
        assert_eq!(
            outcome_label(&AppOutcome::Skipped(SkipReason::Cancelled)).0,
            "cancelled"
        );
    }
}
