//! Version code resolution from release tags.
//!
//! Every release needs an integer code so retention can order builds and
//! filenames stay unique. Resolution is total: tags without a usable
//! number fall back to a stable hash, so the same tag maps to the same
//! code on every run.

use sha2::{Digest, Sha256};

/// Upper bound of hash-derived codes; real numeric codes beyond it are rare
/// enough that a fallback value is recognizable.
pub const HASH_FALLBACK_BOUND: u64 = 10_000;

/// Prerelease markers treated as a `.`-separated continuation of the version.
/// Longer markers come first so `-preview` is not consumed as `-pre`.
const PRERELEASE_MARKERS: &[&str] = &["-preview", "-nightly", "-alpha", "-beta", "-pre", "-rc"];

/// Resolve the version code for a tag.
///
/// Components are scanned right to left after splitting on `.`; the first
/// positive all-digit component wins.
///
/// # Example
///
/// ```
/// use fdrepo_schema::version_code::resolve;
///
/// assert_eq!(resolve("v2.3.41"), 41);
/// assert_eq!(resolve("v1.2.0"), 2);
/// assert_eq!(resolve("1.4.0-rc3"), 3);
/// assert_eq!(resolve("release-foo"), resolve("release-foo"));
/// ```
pub fn resolve(tag: &str) -> i32 {
    numeric_code(tag).unwrap_or_else(|| hash_code(tag))
}

/// Whether `tag` resolves through the hash fallback rather than a number.
pub fn is_fallback(tag: &str) -> bool {
    numeric_code(tag).is_none()
}

fn numeric_code(tag: &str) -> Option<i32> {
    let mut normalized = tag.to_lowercase();
    for marker in PRERELEASE_MARKERS {
        normalized = normalized.replace(marker, ".");
    }
    let normalized = normalized.replace('+', ".");

    normalized
        .split('.')
        .rev()
        .filter(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|part| part.parse::<i32>().ok())
        .find(|code| *code > 0)
}

fn hash_code(tag: &str) -> i32 {
    let digest = Sha256::digest(tag.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let reduced = u64::from_be_bytes(prefix) % HASH_FALLBACK_BOUND;
    if reduced == 0 {
        HASH_FALLBACK_BOUND as i32
    } else {
        reduced as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_numeric_component() {
        assert_eq!(resolve("v2.3.41"), 41);
        assert_eq!(resolve("1.0.7"), 7);
        assert_eq!(resolve("build.1234"), 1234);
    }

    #[test]
    fn test_zero_components_are_skipped() {
        assert_eq!(resolve("v1.2.0"), 2);
        assert_eq!(resolve("v1.1.0"), 1);
    }

    #[test]
    fn test_prerelease_markers_continue_the_version() {
        assert_eq!(resolve("v1.4.0-beta.5"), 5);
        assert_eq!(resolve("1.4.0-RC2"), 2);
        assert_eq!(resolve("2.0-preview7"), 7);
        assert_eq!(resolve("2.0.1+88"), 88);
        assert_eq!(resolve("3.1-nightly"), 1);
    }

    #[test]
    fn test_non_numeric_components_do_not_parse() {
        // "v3" is not all digits, "beta" neither.
        assert!(is_fallback("v3"));
        assert!(is_fallback("release-foo"));
        assert!(is_fallback("v1.0.0"));
        assert!(!is_fallback("v1.0.1"));
    }

    #[test]
    fn test_hash_fallback_is_deterministic_and_bounded() {
        let first = resolve("release-foo");
        for _ in 0..5 {
            assert_eq!(resolve("release-foo"), first);
        }
        assert!(first > 0);
        assert!(u64::from(first.unsigned_abs()) <= HASH_FALLBACK_BOUND);
    }

    #[test]
    fn test_overflowing_components_are_ignored() {
        assert_eq!(resolve("5.99999999999"), 5);
    }
}
