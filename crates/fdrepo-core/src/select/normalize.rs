//! Raw provider records → validated [`Release`]s.
//!
//! Providers are loose about their payloads: tags come as `tag_name` or
//! `tag`, timestamps may be missing, assets may lack a URL. Everything
//! downstream relies on the shape guaranteed here instead.

use chrono::{DateTime, Utc};
use fdrepo_schema::{Asset, PACKAGE_EXTENSION, Release};
use serde_json::Value;

use crate::error::ProviderError;

/// Outcome of normalizing one app's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Valid releases in provider order.
    pub releases: Vec<Release>,
    /// Records rejected as malformed.
    pub rejected: usize,
    /// Well-formed records dropped because they carry no package asset
    /// (or are unpublished drafts).
    pub dropped: usize,
}

/// Normalize every record, skipping malformed ones. Order is preserved.
pub fn normalize(records: &[Value]) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for (index, record) in records.iter().enumerate() {
        match normalize_record(record) {
            Ok(Some(release)) => report.releases.push(release),
            Ok(None) => report.dropped += 1,
            Err(e) => {
                tracing::warn!("skipping release record {index}: {e}");
                report.rejected += 1;
            }
        }
    }
    report
}

/// Normalize a single record.
///
/// Returns `Ok(None)` when the record is well formed but has nothing to
/// publish.
///
/// # Errors
///
/// Returns [`ProviderError::MalformedRecord`] when the tag is missing or
/// the prerelease flag is not a boolean.
pub fn normalize_record(record: &Value) -> Result<Option<Release>, ProviderError> {
    let Some(fields) = record.as_object() else {
        return Err(ProviderError::MalformedRecord("record is not an object".into()));
    };

    let tag = ["tag_name", "tag"]
        .iter()
        .find_map(|key| fields.get(*key).filter(|v| !v.is_null()))
        .ok_or_else(|| ProviderError::MalformedRecord("missing tag".into()))?
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProviderError::MalformedRecord("tag is not a non-empty string".into()))?
        .to_string();

    let is_prerelease = match fields.get("prerelease") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(ProviderError::MalformedRecord(format!(
                "{tag}: prerelease flag is {other}, expected a boolean"
            )));
        }
    };

    if fields.get("draft").and_then(Value::as_bool) == Some(true) {
        tracing::debug!("{tag}: draft release, dropped");
        return Ok(None);
    }

    let published_at = fields
        .get("published_at")
        .and_then(|v| parse_timestamp(&tag, v));

    let assets: Vec<Asset> = fields
        .get("assets")
        .and_then(Value::as_array)
        .map(|assets| {
            assets
                .iter()
                .filter_map(|asset| parse_asset(&tag, asset))
                .filter(|asset| asset.has_extension(PACKAGE_EXTENSION))
                .collect()
        })
        .unwrap_or_default();

    if assets.is_empty() {
        tracing::debug!("{tag}: no .{PACKAGE_EXTENSION} assets, dropped");
        return Ok(None);
    }

    Ok(Some(Release {
        tag,
        is_prerelease,
        published_at,
        assets,
    }))
}

fn parse_timestamp(tag: &str, value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Null => None,
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                tracing::debug!("{tag}: ignoring published_at '{s}': {e}");
                None
            }
        },
        other => {
            tracing::debug!("{tag}: ignoring non-string published_at {other}");
            None
        }
    }
}

fn parse_asset(tag: &str, value: &Value) -> Option<Asset> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let url = ["browser_download_url", "download_url"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|u| !u.is_empty());

    match (name, url) {
        (Some(name), Some(url)) => Some(Asset::new(name, url)),
        _ => {
            tracing::warn!("{tag}: skipping malformed asset {value}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_github_record() {
        let record = json!({
            "tag_name": "v1.2.0",
            "prerelease": false,
            "published_at": "2024-03-01T12:00:00Z",
            "assets": [
                {"name": "app-arm64-v8a.apk", "browser_download_url": "https://dl/arm64"},
                {"name": "checksums.txt", "browser_download_url": "https://dl/sums"},
                {"name": "App-Universal.APK", "browser_download_url": "https://dl/uni"}
            ]
        });

        let release = normalize_record(&record).unwrap().unwrap();
        assert_eq!(release.tag, "v1.2.0");
        assert!(!release.is_prerelease);
        assert_eq!(
            release.published_at.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
        let names: Vec<_> = release.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["app-arm64-v8a.apk", "App-Universal.APK"]);
    }

    #[test]
    fn test_generic_record_shape() {
        let record = json!({
            "tag": "2.0",
            "assets": [{"name": "app.apk", "download_url": "https://dl/app"}]
        });
        let release = normalize_record(&record).unwrap().unwrap();
        assert_eq!(release.tag, "2.0");
        assert!(!release.is_prerelease, "absent flag means stable");
        assert_eq!(release.published_at, None);
        assert_eq!(release.assets[0].download_url, "https://dl/app");
    }

    #[test]
    fn test_missing_tag_and_bad_flag_are_rejected() {
        let no_tag = json!({"assets": [{"name": "a.apk", "download_url": "u"}]});
        assert!(matches!(
            normalize_record(&no_tag),
            Err(ProviderError::MalformedRecord(_))
        ));

        let empty_tag = json!({"tag_name": "  ", "assets": []});
        assert!(normalize_record(&empty_tag).is_err());

        let bad_flag = json!({
            "tag_name": "v1",
            "prerelease": "yes",
            "assets": [{"name": "a.apk", "download_url": "u"}]
        });
        assert!(normalize_record(&bad_flag).is_err());
    }

    #[test]
    fn test_unparseable_timestamp_becomes_absent() {
        let record = json!({
            "tag_name": "v1",
            "published_at": "last tuesday",
            "assets": [{"name": "a.apk", "browser_download_url": "u"}]
        });
        assert_eq!(normalize_record(&record).unwrap().unwrap().published_at, None);
    }

    #[test]
    fn test_report_counts_and_order() {
        let records = vec![
            json!({"tag_name": "v3", "assets": [{"name": "a.apk", "browser_download_url": "u3"}]}),
            json!("not an object"),
            json!({"tag_name": "v2", "assets": [{"name": "notes.txt", "browser_download_url": "u"}]}),
            json!({"tag_name": "v1", "assets": [
                {"name": "broken.apk"},
                {"name": "a.apk", "browser_download_url": "u1"}
            ]}),
            json!({"tag_name": "v0", "draft": true, "assets": [{"name": "a.apk", "browser_download_url": "u0"}]}),
        ];

        let report = normalize(&records);
        let tags: Vec<_> = report.releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["v3", "v1"]);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.releases[1].assets.len(), 1);
    }
}
