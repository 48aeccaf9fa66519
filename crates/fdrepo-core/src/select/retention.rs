//! Bounded retention per channel.
//!
//! A plan merges what the store already holds with this run's candidates,
//! keeps the newest `depth` entries and splits the rest into evictions
//! (retained entries) and skips (candidates that never made the cut).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use fdrepo_schema::{BuildDescriptor, Channel, RetainedBuild, SelectedBuild, newest_first};
use serde::Serialize;

use crate::error::RetentionError;
use crate::report::SkipReason;

/// Lifecycle of one release of one app within a run.
///
/// ```text
/// candidate ─┬─> Skipped(reason)
///            ├─> Superseded
///            ├─> AlreadyRetained
///            └─> PendingFetch ─┬─> Retained
///                              └─> FetchFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Skipped(SkipReason),
    /// Newer builds fill the retained set.
    Superseded,
    AlreadyRetained,
    PendingFetch,
    Retained,
    FetchFailed,
}

impl BuildState {
    /// Resolve a pending fetch once the store has answered.
    pub fn settle(self, fetched: bool) -> Self {
        match (self, fetched) {
            (Self::PendingFetch, true) => Self::Retained,
            (Self::PendingFetch, false) => Self::FetchFailed,
            (state, _) => state,
        }
    }
}

/// One entry of the kept set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedBuild {
    /// Already in the store; never re-fetched.
    Retained(RetainedBuild),
    /// New this run; must be downloaded before commit.
    Fetch(SelectedBuild),
}

impl PlannedBuild {
    pub fn build(&self) -> &SelectedBuild {
        match self {
            Self::Retained(r) => &r.build,
            Self::Fetch(b) => b,
        }
    }

    pub fn state(&self) -> BuildState {
        match self {
            Self::Retained(_) => BuildState::AlreadyRetained,
            Self::Fetch(_) => BuildState::PendingFetch,
        }
    }
}

struct Entry {
    planned: PlannedBuild,
    /// Ordering timestamp.
    at: Option<DateTime<Utc>>,
}

/// What to do with one channel of one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub channel: Channel,
    /// The retained set after this run, newest first.
    pub kept: Vec<PlannedBuild>,
    /// Stored builds to delete.
    pub evict: Vec<RetainedBuild>,
    /// Candidate versions that did not fit.
    pub skipped: Vec<String>,
}

impl RetentionPlan {
    /// Builds that must be downloaded.
    pub fn fetches(&self) -> impl Iterator<Item = &SelectedBuild> {
        self.kept.iter().filter_map(|p| match p {
            PlannedBuild::Fetch(b) => Some(b),
            PlannedBuild::Retained(_) => None,
        })
    }

    /// Stored builds that stay.
    pub fn keeps(&self) -> impl Iterator<Item = &RetainedBuild> {
        self.kept.iter().filter_map(|p| match p {
            PlannedBuild::Retained(r) => Some(r),
            PlannedBuild::Fetch(_) => None,
        })
    }

    /// Build descriptors for the kept set, newest first.
    pub fn descriptor(&self) -> Vec<BuildDescriptor> {
        self.kept.iter().map(|p| p.build().descriptor()).collect()
    }

    /// Nothing to download and nothing to delete.
    pub fn is_noop(&self) -> bool {
        self.fetches().next().is_none() && self.evict.is_empty()
    }

    /// State of every version this plan touched.
    pub fn states(&self) -> Vec<(String, BuildState)> {
        self.kept
            .iter()
            .map(|p| (p.build().version_name.clone(), p.state()))
            .chain(
                self.skipped
                    .iter()
                    .map(|v| (v.clone(), BuildState::Superseded)),
            )
            .collect()
    }
}

/// Keeps at most `depth` builds per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    depth: usize,
}

impl RetentionPolicy {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Plan the retained set of `channel`.
    ///
    /// `candidates` are this run's selections (any order). A candidate whose
    /// version is already retained is not fetched again.
    ///
    /// # Errors
    ///
    /// [`RetentionError::ChannelMismatch`] if any input belongs to another
    /// channel, [`RetentionError::DuplicateVersionCode`] if two kept builds
    /// would share a version code.
    pub fn plan(
        &self,
        channel: Channel,
        retained: Vec<RetainedBuild>,
        candidates: Vec<SelectedBuild>,
    ) -> Result<RetentionPlan, RetentionError> {
        for build in retained.iter().map(|r| &r.build).chain(&candidates) {
            if build.channel != channel {
                return Err(RetentionError::ChannelMismatch {
                    version: build.version_name.clone(),
                    expected: channel,
                    found: build.channel,
                });
            }
        }

        // Stored builds are ordered the way the catalog orders releases. The
        // file mtime only decides when there is no catalog to compare with.
        let catalog_order = !candidates.is_empty();
        let mut entries: Vec<Entry> = Vec::with_capacity(retained.len() + candidates.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut evict = Vec::new();

        for build in retained {
            if index.contains_key(&build.build.version_name) {
                evict.push(build);
            } else {
                index.insert(build.build.version_name.clone(), entries.len());
                let at = if catalog_order {
                    build.build.published_at
                } else {
                    build.recency()
                };
                entries.push(Entry {
                    planned: PlannedBuild::Retained(build),
                    at,
                });
            }
        }

        for build in candidates {
            match index.get(&build.version_name) {
                Some(&i) => {
                    let entry = &mut entries[i];
                    entry.at = build.published_at;
                    // Registries written without a timestamp learn it here.
                    if let (PlannedBuild::Retained(r), Some(at)) =
                        (&mut entry.planned, build.published_at)
                    {
                        r.build.published_at = Some(at);
                    }
                }
                None => {
                    index.insert(build.version_name.clone(), entries.len());
                    entries.push(Entry {
                        at: build.published_at,
                        planned: PlannedBuild::Fetch(build),
                    });
                }
            }
        }

        entries.sort_by(|a, b| {
            newest_first(
                a.at,
                &a.planned.build().version_name,
                b.at,
                &b.planned.build().version_name,
            )
        });
        let mut entries: Vec<PlannedBuild> = entries.into_iter().map(|e| e.planned).collect();

        let overflow = entries.split_off(self.depth.min(entries.len()));
        let kept = entries;

        let mut codes: HashMap<i32, &str> = HashMap::new();
        for build in kept.iter().map(PlannedBuild::build) {
            if let Some(first) = codes.insert(build.version_code, &build.version_name) {
                let err = RetentionError::DuplicateVersionCode {
                    channel,
                    code: build.version_code,
                    first: first.to_string(),
                    second: build.version_name.clone(),
                };
                tracing::error!("{err}");
                return Err(err);
            }
        }

        let mut skipped = Vec::new();
        for entry in overflow {
            match entry {
                PlannedBuild::Retained(r) => evict.push(r),
                PlannedBuild::Fetch(b) => skipped.push(b.version_name),
            }
        }

        // Never delete a file the kept set still points at.
        let kept_outputs: HashSet<&str> = kept.iter().map(|p| p.build().output_name.as_str()).collect();
        evict.retain(|r| !kept_outputs.contains(r.build.output_name.as_str()));

        Ok(RetentionPlan {
            channel,
            kept,
            evict,
            skipped,
        })
    }
}
