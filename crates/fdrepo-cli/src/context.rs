//! Repository context shared by the subcommands

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use fdrepo_core::config::{LoadedApps, Settings, load_apps};
use fdrepo_core::paths::SETTINGS_FILE;
use fdrepo_core::RepoLayout;
use fdrepo_schema::{AppId, TrackedApp};

use crate::Cli;

/// Settings, layout and tracked apps of one repository checkout.
#[derive(Debug)]
pub struct RepoContext {
    pub settings: Settings,
    pub layout: RepoLayout,
    pub apps_path: PathBuf,
    pub loaded: LoadedApps,
}

impl RepoContext {
    /// Load everything a subcommand needs. Configuration errors abort here,
    /// before any app is touched.
    pub fn load(cli: &Cli) -> Result<Self> {
        let settings_path = cli
            .config
            .clone()
            .unwrap_or_else(|| cli.root.join(SETTINGS_FILE));
        if cli.config.is_some() && !settings_path.exists() {
            bail!("settings file {} does not exist", settings_path.display());
        }
        let settings = Settings::load(&settings_path)
            .with_context(|| format!("Failed to load {}", settings_path.display()))?;

        let apps_path = cli.apps_path();
        let loaded = load_apps(&apps_path)
            .with_context(|| format!("Failed to load {}", apps_path.display()))?;

        Ok(Self {
            layout: RepoLayout::new(&cli.root, &settings.paths),
            settings,
            apps_path,
            loaded,
        })
    }

    pub fn apps(&self) -> &[TrackedApp] {
        &self.loaded.apps
    }

    /// Entries of the app list that could not be adapted.
    pub fn rejected(&self) -> &[String] {
        &self.loaded.rejected
    }

    /// Apps named by `--only`, or every app when the filter is empty.
    pub fn filtered(&self, only: &[AppId]) -> Vec<&TrackedApp> {
        self.apps()
            .iter()
            .filter(|a| only.is_empty() || only.contains(&a.id))
            .collect()
    }
}

/// Parse `--only` values into ids.
pub fn parse_only(only: &[String]) -> Vec<AppId> {
    only.iter().map(AppId::new).collect()
}
