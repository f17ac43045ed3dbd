//! # Version Parsing and Ordering
//!
//! Inventory versions are semantic versions, conventionally written with a
//! leading `v` (`v1.2.3`). This module parses them leniently for comparison
//! and strictly for validation:
//!
//! - [`parse`] accepts `1.2.3` and `v1.2.3`, returning `None` for anything
//!   else.
//! - [`compare`] orders two version strings, treating an unparseable string as
//!   lower than every valid version. Two unparseable strings compare equal.
//! - [`is_newer`] is the "strictly greater" test the reconciler uses.
//! - [`validate`] is the strict form used while reading manifests.

use std::cmp::Ordering;

use semver::Version;

use crate::error::{Error, Result};

/// Parse a version string, accepting an optional leading `v`.
pub fn parse(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(stripped).ok()
}

/// Compare two version strings; malformed versions sort lowest.
pub fn compare(left: &str, right: &str) -> Ordering {
    match (parse(left), parse(right)) {
        (Some(l), Some(r)) => l.cmp(&r),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// True when `candidate` is strictly greater than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// Validate that `version` is a semantic version.
///
/// `section` and `name` only feed the error message.
pub fn validate(section: &str, name: &str, version: &str) -> Result<Version> {
    parse(version).ok_or_else(|| {
        Error::manifest(
            section,
            format!(
                "invalid semantic version '{}' for {} (expected e.g. v1.2.3)",
                version, name
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!(parse("v1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse("1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse(" v2.1.3 "), Some(Version::new(2, 1, 3)));
        assert_eq!(parse("v1.0"), None);
        assert_eq!(parse("latest"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_parse_prerelease() {
        let parsed = parse("v3.0.0-rc.1").unwrap();
        assert_eq!(parsed.pre.as_str(), "rc.1");
    }

    #[test]
    fn test_compare_orders_semver_not_lexically() {
        assert_eq!(compare("v1.10.0", "v1.9.0"), Ordering::Greater);
        assert_eq!(compare("1.2.0", "v1.2.0"), Ordering::Equal);
        assert_eq!(compare("v1.0.0-alpha", "v1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_malformed_sorts_lowest() {
        assert_eq!(compare("garbage", "v0.0.1"), Ordering::Less);
        assert_eq!(compare("v0.0.1", "garbage"), Ordering::Greater);
        assert_eq!(compare("garbage", "other"), Ordering::Equal);
        assert!(!is_newer("garbage", "v0.0.1"));
        assert!(is_newer("v0.0.1", "garbage"));
    }

    #[test]
    fn test_is_newer_is_strict() {
        assert!(is_newer("v1.3.0", "v1.2.0"));
        assert!(!is_newer("v1.2.0", "v1.2.0"));
        assert!(!is_newer("v1.1.0", "v1.2.0"));
    }

    #[test]
    fn test_validate_names_section() {
        assert!(validate("tools", "helm", "v3.8.0").is_ok());
        let err = validate("helm-plugins", "diff", "main").unwrap_err();
        let display = format!("{}", err);
        assert!(display.contains("helm-plugins"));
        assert!(display.contains("diff"));
        assert!(display.contains("'main'"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compare_is_antisymmetric(a in 0u64..50, b in 0u64..50, c in 0u64..50,
                                        x in 0u64..50, y in 0u64..50, z in 0u64..50) {
                let left = format!("v{}.{}.{}", a, b, c);
                let right = format!("{}.{}.{}", x, y, z);
                prop_assert_eq!(compare(&left, &right), compare(&right, &left).reverse());
            }

            #[test]
            fn valid_always_beats_malformed(a in 0u64..50, b in 0u64..50, c in 0u64..50,
                                            junk in "[a-z]{1,8}") {
                let valid = format!("v{}.{}.{}", a, b, c);
                prop_assert!(is_newer(&valid, &junk));
            }
        }
    }
}
