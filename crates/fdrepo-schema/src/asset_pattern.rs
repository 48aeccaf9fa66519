//! Architecture classification of APK asset names.
//! Handles naming inconsistencies across projects: arm64/aarch64, universal/all, armeabi/v7a.

use serde::{Deserialize, Serialize};

/// Tokens that mark an asset as built for a platform this repository never serves.
const EXCLUDED_TOKENS: &[&str] = &["x86", "x64", "amd64", "windows", "linux", "macos"];

/// Tokens that indicate some CPU architecture is named in the filename.
const ARCH_TOKENS: &[&str] = &["arm", "x86", "x64", "amd64"];

/// CPU architecture class detected in an asset filename.
///
/// Variants are declared from most to least preferred; [`ArchClass::score`]
/// turns them into a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchClass {
    /// 64-bit ARM (`arm64`, `aarch64`), the repository's target.
    Arm64,
    /// Fat APK bundling every ABI (`universal`, `all`).
    Universal,
    /// No architecture named at all; assumed to run everywhere.
    Agnostic,
    /// 32-bit ARM (`armeabi`, `v7a`), accepted as a last resort.
    Armv7,
    /// Names an architecture we do not rank (e.g. a bare `arm`).
    Unranked,
    /// Desktop OS or x86 family; never selected.
    Excluded,
}

impl ArchClass {
    /// Ranking score; `None` for classes that must never be selected.
    pub fn score(self) -> Option<u8> {
        match self {
            Self::Arm64 => Some(4),
            Self::Universal => Some(3),
            Self::Agnostic => Some(2),
            Self::Armv7 => Some(1),
            Self::Unranked | Self::Excluded => None,
        }
    }
}

/// A parsed representation of an asset filename's platform indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPattern {
    /// Detected architecture class.
    pub arch: ArchClass,
}

impl AssetPattern {
    /// Parse the architecture class from a filename, ignoring case.
    ///
    /// Exclusion wins over every other token, so `app-universal-x86.apk`
    /// is excluded rather than universal.
    pub fn from_filename(filename: &str) -> Self {
        let f = filename.to_lowercase();

        let arch = if EXCLUDED_TOKENS.iter().any(|t| f.contains(t)) {
            ArchClass::Excluded
        } else if f.contains("arm64") || f.contains("aarch64") {
            ArchClass::Arm64
        } else if f.contains("universal") || f.contains("all") {
            ArchClass::Universal
        } else if !ARCH_TOKENS.iter().any(|t| f.contains(t)) {
            ArchClass::Agnostic
        } else if f.contains("armeabi") || f.contains("v7a") {
            ArchClass::Armv7
        } else {
            ArchClass::Unranked
        };

        Self { arch }
    }

    /// Ranking score of the detected class.
    pub fn score(&self) -> Option<u8> {
        self.arch.score()
    }
}
