//! Folding discovered inventory into the running inventory.
//!
//! For each discovered key:
//! - absent from the running map: inserted as-is
//! - present, and not in the [`SessionSnapshot`]: replaced only by a strictly
//!   greater version
//! - present, and in the snapshot: never replaced
//!
//! Malformed versions compare lowest and never raise here.

use log::{debug, warn};

use super::SessionSnapshot;
use crate::package::{Category, PackageMap, VersionedPackage};

/// What happened to one discovered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Inserted,
    Upgraded,
    /// Kept the running entry because the discovered one was not newer.
    Kept,
    /// Kept the running entry because its key predates the run.
    Frozen,
}

/// Fold `discovered` into `running` for one category.
///
/// Returns the number of entries inserted or upgraded.
pub fn reconcile(
    category: Category,
    discovered: &PackageMap,
    snapshot: &SessionSnapshot,
    running: &mut PackageMap,
) -> usize {
    let mut changed = 0;
    for candidate in discovered.values() {
        match decide(category, candidate, snapshot, running) {
            Decision::Inserted | Decision::Upgraded => {
                running.insert(candidate.name.clone(), candidate.clone());
                changed += 1;
            }
            Decision::Kept | Decision::Frozen => {}
        }
    }
    changed
}

/// Decide the fate of `candidate` against the running map, without applying it.
pub fn decide(
    category: Category,
    candidate: &VersionedPackage,
    snapshot: &SessionSnapshot,
    running: &PackageMap,
) -> Decision {
    let Some(current) = running.get(&candidate.name) else {
        debug!("{} {}: discovered {}", category, candidate.name, candidate.version);
        return Decision::Inserted;
    };

    if snapshot.contains(category, &candidate.name) {
        if current.version != candidate.version {
            debug!(
                "{} {}: keeping {} declared by the root over {}",
                category, candidate.name, current.version, candidate.version
            );
        }
        return Decision::Frozen;
    }

    if crate::version::is_newer(&candidate.version, &current.version) {
        warn!(
            "{} {}: upgrading {} to {} required by a dependency",
            category, candidate.name, current.version, candidate.version
        );
        Decision::Upgraded
    } else {
        Decision::Kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Inventory;

    fn tool(name: &str, version: &str) -> VersionedPackage {
        VersionedPackage::new(name, version, format!("https://example.com/{}/{}", name, version))
    }

    fn map(entries: &[(&str, &str)]) -> PackageMap {
        entries
            .iter()
            .map(|(name, version)| (name.to_string(), tool(name, version)))
            .collect()
    }

    fn snapshot_of(tools: &PackageMap) -> SessionSnapshot {
        SessionSnapshot::capture(&Inventory {
            tools: tools.clone(),
            ..Default::default()
        })
    }

    #[test]
    fn test_inserts_absent_keys() {
        let snapshot = SessionSnapshot::default();
        let mut running = PackageMap::new();

        let changed = reconcile(Category::Tools, &map(&[("x", "2.0.0")]), &snapshot, &mut running);

        assert_eq!(changed, 1);
        assert_eq!(running["x"].version, "2.0.0");
    }

    #[test]
    fn test_discovered_keys_take_strictly_greater_versions() {
        let snapshot = SessionSnapshot::default();
        let mut running = map(&[("x", "2.0.0")]);

        assert_eq!(reconcile(Category::Tools, &map(&[("x", "1.9.0")]), &snapshot, &mut running), 0);
        assert_eq!(running["x"].version, "2.0.0");

        assert_eq!(reconcile(Category::Tools, &map(&[("x", "2.1.0")]), &snapshot, &mut running), 1);
        assert_eq!(running["x"].version, "2.1.0");
    }

    #[test]
    fn test_equal_version_keeps_first_sighting() {
        let snapshot = SessionSnapshot::default();
        let mut running = map(&[("x", "2.0.0")]);
        let mut other = map(&[("x", "2.0.0")]);
        other.get_mut("x").unwrap().url = "https://mirror.example.com/x".to_string();

        reconcile(Category::Tools, &other, &snapshot, &mut running);

        assert_eq!(running["x"].url, "https://example.com/x/2.0.0");
    }

    #[test]
    fn test_snapshot_keys_are_frozen() {
        let root = map(&[("x", "3.0.0")]);
        let snapshot = snapshot_of(&root);
        let mut running = root.clone();

        let changed = reconcile(Category::Tools, &map(&[("x", "5.0.0")]), &snapshot, &mut running);

        assert_eq!(changed, 0);
        assert_eq!(running["x"].version, "3.0.0");
    }

    #[test]
    fn test_snapshot_is_per_category() {
        let root = map(&[("x", "3.0.0")]);
        let snapshot = snapshot_of(&root);
        let mut clusters = map(&[("x", "1.0.0")]);

        reconcile(Category::Clusters, &map(&[("x", "2.0.0")]), &snapshot, &mut clusters);

        assert_eq!(clusters["x"].version, "2.0.0");
    }

    #[test]
    fn test_malformed_versions_compare_lowest() {
        let snapshot = SessionSnapshot::default();
        let mut running = map(&[("x", "not-a-version")]);

        reconcile(Category::Tools, &map(&[("x", "0.0.1")]), &snapshot, &mut running);
        assert_eq!(running["x"].version, "0.0.1");

        reconcile(Category::Tools, &map(&[("x", "garbage")]), &snapshot, &mut running);
        assert_eq!(running["x"].version, "0.0.1");
    }

    #[test]
    fn test_decide_reports_frozen() {
        let root = map(&[("x", "3.0.0")]);
        let snapshot = snapshot_of(&root);
        assert_eq!(
            decide(Category::Tools, &tool("x", "9.0.0"), &snapshot, &root),
            Decision::Frozen
        );
        assert_eq!(
            decide(Category::Tools, &tool("y", "1.0.0"), &snapshot, &root),
            Decision::Inserted
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Outside the snapshot, the running version is the maximum declared.
            #[test]
            fn running_version_is_maximum(versions in prop::collection::vec((0u64..20, 0u64..20, 0u64..20), 1..12)) {
                let snapshot = SessionSnapshot::default();
                let mut running = PackageMap::new();
                for (major, minor, patch) in &versions {
                    let version = format!("{}.{}.{}", major, minor, patch);
                    reconcile(Category::Tools, &map(&[("x", version.as_str())]), &snapshot, &mut running);
                }
                let max = versions.iter().max().unwrap();
                let expected = format!("{}.{}.{}", max.0, max.1, max.2);
                prop_assert_eq!(&running["x"].version, &expected);
            }

            /// Snapshot keys never move.
            #[test]
            fn snapshot_keys_never_change(initial in (0u64..20, 0u64..20), later in prop::collection::vec((0u64..50, 0u64..50), 1..8)) {
                let initial = format!("{}.{}.0", initial.0, initial.1);
                let root = map(&[("x", initial.as_str())]);
                let snapshot = snapshot_of(&root);
                let mut running = root.clone();
                for (major, minor) in later {
                    let version = format!("{}.{}.0", major, minor);
                    reconcile(Category::Tools, &map(&[("x", version.as_str())]), &snapshot, &mut running);
                }
                prop_assert_eq!(&running, &root);
            }
        }
    }
}
