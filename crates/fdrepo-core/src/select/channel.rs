//! Channel classification.

use std::cmp::Ordering;
use std::collections::HashSet;

use fdrepo_schema::{Channel, Release, newest_first};

/// Newest-first ordering of releases.
pub fn recency_cmp(a: &Release, b: &Release) -> Ordering {
    newest_first(a.published_at, &a.tag, b.published_at, &b.tag)
}

/// Releases of the configured channel, newest first.
///
/// There is no fallback: an app that prefers prereleases never receives a
/// stable build and vice versa. Repeated tags keep their newest record.
pub fn candidates(prefer_prerelease: bool, releases: Vec<Release>) -> Vec<Release> {
    let channel = Channel::from_prerelease(prefer_prerelease);
    let mut matching: Vec<Release> = releases
        .into_iter()
        .filter(|r| r.channel() == channel)
        .collect();
    matching.sort_by(recency_cmp);

    let mut seen = HashSet::new();
    matching.retain(|r| seen.insert(r.tag.clone()));
    matching
}
