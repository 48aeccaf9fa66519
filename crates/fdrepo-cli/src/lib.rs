//! fdrepo - feeds an F-Droid repository from GitHub releases
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! # Overview
//!
//! Every tracked app in `apps.yaml` is checked against its upstream
//! releases. The newest builds of the configured channel are downloaded
//! into `apks/<id>/`, older ones are evicted, and `fdroid/metadata/<id>.yml`
//! is rewritten for `fdroid update`.
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── apps.yaml         # tracked apps
//! ├── fdrepo.toml       # settings (optional)
//! ├── apks/<id>/        # retained artifacts + retained.json
//! └── fdroid/
//!     ├── repo/         # flattened mirror
//!     └── metadata/     # build descriptors
//! ```

pub mod cmd;
pub mod context;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fdrepo")]
#[command(author, version, about = "fdrepo - feed an F-Droid repository from GitHub releases")]
pub struct Cli {
    /// Repository root
    #[arg(long, global = true, env = "FDREPO_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// App list (default: <root>/apps.yaml)
    #[arg(long, global = true, env = "FDREPO_APPS")]
    pub apps: Option<PathBuf>,

    /// Settings file (default: <root>/fdrepo.toml)
    #[arg(long, global = true, env = "FDREPO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The app list this invocation reads and writes.
    pub fn apps_path(&self) -> PathBuf {
        self.apps
            .clone()
            .unwrap_or_else(|| self.root.join(fdrepo_core::paths::APPS_FILE))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start tracking a GitHub project
    Add(AddArgs),
    /// Download new builds, evict old ones and rewrite metadata
    Update(UpdateArgs),
    /// Show which builds each app would publish, without downloading
    Check(CheckArgs),
    /// Show retained builds per app (offline)
    Status {
        /// Also write a markdown status page to this file
        #[arg(long)]
        markdown: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Only process these app ids (removed apps are left alone)
    #[arg(long, value_name = "ID")]
    pub only: Vec<String>,

    /// Plan only: download, write and delete nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error if any app failed
    #[arg(long)]
    pub strict: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// GitHub token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// GitHub project URL (or owner/repo)
    pub url: String,

    /// Package name (default: applicationId found in --checkout)
    #[arg(long)]
    pub id: Option<String>,

    /// Display name (default: derived from the repository name)
    #[arg(long)]
    pub name: Option<String>,

    /// Follow the prerelease channel
    #[arg(long)]
    pub prerelease: bool,

    /// Mark the app as archived
    #[arg(long)]
    pub archive: bool,

    /// Repository category, repeatable (default: Misc)
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    /// Local clone of the project to read the package name from
    #[arg(long, value_name = "DIR")]
    pub checkout: Option<PathBuf>,

    /// Print the entry instead of writing the app list
    #[arg(long)]
    pub print: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Only check these app ids
    #[arg(long, value_name = "ID")]
    pub only: Vec<String>,

    /// GitHub token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// The token passed on the command line or via `GH_TOKEN`, else `GITHUB_TOKEN`.
pub fn resolve_token(token: Option<&str>) -> Option<String> {
    token
        .map(str::to_string)
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .filter(|t| !t.trim().is_empty())
}
