//! Per-app metadata consumed by `fdroid update`.

use fdrepo_schema::{BuildDescriptor, TrackedApp};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Builds kept in the main index of an archived app; older ones move to
/// the archive repository.
pub const ARCHIVED_KEEP: u32 = 1;

/// `metadata/<id>.yml` in F-Droid's metadata format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub name: String,
    pub source_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_policy: Option<u32>,
    #[serde(default)]
    pub builds: Vec<BuildDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version_code: Option<i32>,
}

impl AppMetadata {
    /// Describe `app` with its retained builds (newest first).
    pub fn new(app: &TrackedApp, builds: Vec<BuildDescriptor>) -> Self {
        let current = builds.first();
        Self {
            categories: app.categories.iter().cloned().collect(),
            author_name: app.author.clone(),
            name: app.display_name.clone(),
            source_code: app.source_location.clone(),
            archive_policy: app.archive.then_some(ARCHIVED_KEEP),
            current_version: current.map(|b| b.version_name.clone()),
            current_version_code: current.map(|b| b.version_code),
            builds,
        }
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Metadata`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, StoreError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn descriptor(name: &str, code: i32) -> BuildDescriptor {
        BuildDescriptor {
            version_name: name.into(),
            version_code: code,
            commit: name.into(),
            output: format!("org.example_{code}.apk"),
            disable: false,
        }
    }

    #[test]
    fn test_metadata_document() {
        let app = TrackedApp {
            id: "org.example".into(),
            display_name: "Example".into(),
            source_location: "https://github.com/o/example".into(),
            prefer_prerelease: false,
            categories: BTreeSet::from(["System".to_string(), "Internet".to_string()]),
            author: Some("o".into()),
            archive: true,
        };
        let meta = AppMetadata::new(&app, vec![descriptor("v1.2.0", 2), descriptor("v1.1.0", 1)]);
        let doc: serde_yaml::Value = serde_yaml::from_str(&meta.to_yaml().unwrap()).unwrap();

        assert_eq!(doc["Name"], "Example");
        assert_eq!(doc["AuthorName"], "o");
        assert_eq!(doc["SourceCode"], "https://github.com/o/example");
        assert_eq!(doc["Categories"][0], "Internet");
        assert_eq!(doc["ArchivePolicy"], 1);
        assert_eq!(doc["CurrentVersion"], "v1.2.0");
        assert_eq!(doc["CurrentVersionCode"], 2);
        assert_eq!(doc["Builds"][1]["versionName"], "v1.1.0");
        assert_eq!(doc["Builds"][1]["output"], "org.example_1.apk");
        assert_eq!(doc["Builds"][1]["disable"], false);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let app = TrackedApp {
            id: "org.bare".into(),
            display_name: "Bare".into(),
            source_location: "https://github.com/o/bare".into(),
            prefer_prerelease: false,
            categories: BTreeSet::new(),
            author: None,
            archive: false,
        };
        let yaml = AppMetadata::new(&app, vec![]).to_yaml().unwrap();
        assert!(!yaml.contains("ArchivePolicy"));
        assert!(!yaml.contains("AuthorName"));
        assert!(!yaml.contains("CurrentVersion"));
        assert!(yaml.contains("Builds: []"));
    }
}
