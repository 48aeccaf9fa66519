//! Update command

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use fdrepo_core::forges::GitHubSource;
use fdrepo_core::store::FsArtifactStore;
use fdrepo_core::{Engine, EngineOptions, Reporter, RunReport};

use crate::context::{RepoContext, parse_only};
use crate::ui::ConsoleReporter;
use crate::ui::reporter::Target;
use crate::{UpdateArgs, resolve_token};

/// Run the engine over the configured apps
pub async fn update(ctx: &RepoContext, args: &UpdateArgs) -> Result<ExitCode> {
    let target = if args.json {
        Target::Stderr
    } else {
        Target::Stdout
    };
    let reporter = Arc::new(ConsoleReporter::new(target));

    for reason in ctx.rejected() {
        reporter.warning(&format!("{}: {reason}", ctx.apps_path.display()));
    }
    // An entry that failed to parse must not look like a removed app.
    for id in &ctx.loaded.protected {
        reporter.warning(&format!("{id}: entry rejected, stored builds are kept"));
    }

    let fetch = &ctx.settings.fetch;
    let source = GitHubSource::from_settings(fetch, resolve_token(args.token.as_deref()))
        .context("Failed to set up the GitHub client")?;
    if !source.is_authenticated() {
        tracing::info!("no GitHub token, anonymous rate limits apply");
    }
    let store = FsArtifactStore::from_settings(ctx.layout.clone(), fetch)
        .context("Failed to set up the artifact store")?;

    let options = EngineOptions::from_settings(&ctx.settings)
        .dry_run(args.dry_run)
        .protect(ctx.loaded.protected.iter().cloned());
    let engine = Engine::new(Arc::new(source), Arc::new(store), reporter.clone(), options);

    let stop = engine.stop_handle();
    let interrupt_reporter = reporter.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        interrupt_reporter.warning("interrupted, finishing apps already in progress (Ctrl-C again to abort)");
        stop.stop();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let report = if args.only.is_empty() {
        engine.run(ctx.apps()).await
    } else {
        engine.run_only(ctx.apps(), &parse_only(&args.only)).await
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode run report")?;
        println!("{json}");
    }

    Ok(if run_succeeded(&report, args.strict) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// A run succeeds when every configured app was attempted. With `strict`,
/// any failed app fails the run too.
pub fn run_succeeded(report: &RunReport, strict: bool) -> bool {
    report.all_attempted() && !(strict && report.failed_count() > 0)
}
