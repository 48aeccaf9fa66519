//! Asset ranking within one release.

use fdrepo_schema::{Asset, AssetPattern, Release};

use crate::error::SelectError;

/// Pick the best asset for the repository's target devices.
///
/// Highest score wins; on a tie the asset listed first by the provider is
/// kept. Excluded and unranked assets are never returned.
pub fn select_asset(assets: &[Asset]) -> Option<&Asset> {
    let mut best: Option<(u8, &Asset)> = None;
    for asset in assets {
        let pattern = AssetPattern::from_filename(&asset.name);
        let Some(score) = pattern.score() else {
            tracing::debug!("{}: {:?}, not eligible", asset.name, pattern.arch);
            continue;
        };
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, asset));
        }
    }
    best.map(|(_, asset)| asset)
}

/// [`select_asset`] over a release's assets.
///
/// # Errors
///
/// Returns [`SelectError::NoSuitableAsset`] when no asset is eligible.
pub fn select_for_release(release: &Release) -> Result<&Asset, SelectError> {
    select_asset(&release.assets).ok_or_else(|| SelectError::NoSuitableAsset {
        tag: release.tag.clone(),
    })
}
