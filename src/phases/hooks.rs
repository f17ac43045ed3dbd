//! Hook unification.
//!
//! Bindings are deduplicated on `(owning_tenant, has_own_package)`, keeping
//! the first seen. The winner is the own-package binding with the greatest
//! semantic version; equal versions go to the lexicographically smallest
//! tenant. Every absent claim is then rewritten to carry the winner's package.

use std::cmp::Ordering;
use std::collections::HashSet;

use log::debug;

use super::HookBinding;

/// Unify `bindings`.
pub fn unify(bindings: Vec<HookBinding>) -> Vec<HookBinding> {
    let mut unique = dedup(bindings);

    let Some(winner) = select_winner(&unique).cloned() else {
        debug!("No tenant declares a hook package; nothing to inherit");
        return unique;
    };

    for binding in unique.iter_mut().filter(|b| !b.has_own_package) {
        binding.package = winner.package.clone();
        binding.inherited_from = Some(winner.owning_tenant.clone());
    }

    if let Some(package) = &winner.package {
        debug!("Hook package {} chosen from tenant {}", package, winner.owning_tenant);
    }
    unique
}

/// Drop later duplicates of `(owning_tenant, has_own_package)`.
pub fn dedup(bindings: Vec<HookBinding>) -> Vec<HookBinding> {
    let mut seen = HashSet::new();
    bindings
        .into_iter()
        .filter(|binding| seen.insert((binding.owning_tenant.clone(), binding.has_own_package)))
        .collect()
}

/// The own-package binding with the highest version.
pub fn select_winner(bindings: &[HookBinding]) -> Option<&HookBinding> {
    bindings
        .iter()
        .filter(|binding| binding.has_own_package && binding.package.is_some())
        .min_by(|left, right| rank(left, right))
}

// Orders better bindings first: higher version, then smaller tenant.
fn rank(left: &HookBinding, right: &HookBinding) -> Ordering {
    let version = |binding: &HookBinding| {
        binding
            .package
            .as_ref()
            .map(|p| p.version.clone())
            .unwrap_or_default()
    };
    crate::version::compare(&version(right), &version(left))
        .then_with(|| left.owning_tenant.cmp(&right.owning_tenant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::VersionedPackage;

    fn own(tenant: &str, version: &str) -> HookBinding {
        HookBinding::own(
            tenant,
            VersionedPackage::new(
                format!("{}.hooks", tenant),
                version,
                format!("git::https://example.com/{}.git?ref={}", tenant, version),
            ),
        )
    }

    #[test]
    fn test_highest_version_wins_and_absent_claims_inherit() {
        let bindings = vec![
            HookBinding::absent("root"),
            own("a", "1.2.0"),
            own("b", "1.3.0"),
            HookBinding::absent("c"),
        ];

        let unified = unify(bindings);

        assert_eq!(unified.len(), 4);
        for binding in unified.iter().filter(|b| !b.has_own_package) {
            assert_eq!(binding.inherited_from.as_deref(), Some("b"));
            assert_eq!(binding.package.as_ref().unwrap().version, "1.3.0");
        }
        // Own claims keep their packages
        assert_eq!(unified[1].package.as_ref().unwrap().version, "1.2.0");
        assert_eq!(unified[1].inherited_from, None);
    }

    #[test]
    fn test_winner_is_global_maximum_regardless_of_order() {
        let versions = [("a", "1.10.0"), ("b", "1.2.0"), ("c", "2.0.0"), ("d", "1.9.9")];
        let mut bindings: Vec<HookBinding> = versions.iter().map(|(t, v)| own(t, v)).collect();

        for _ in 0..versions.len() {
            bindings.rotate_left(1);
            assert_eq!(select_winner(&bindings).unwrap().owning_tenant, "c");
        }
    }

    #[test]
    fn test_tie_breaks_on_smallest_tenant() {
        let bindings = vec![own("zeta", "1.0.0"), own("alpha", "1.0.0"), own("mid", "v1.0.0")];
        assert_eq!(select_winner(&bindings).unwrap().owning_tenant, "alpha");
    }

    #[test]
    fn test_single_own_claim_wins_unconditionally() {
        let bindings = vec![HookBinding::absent("root"), own("a", "not-semver")];
        let unified = unify(bindings);
        assert_eq!(unified[0].inherited_from.as_deref(), Some("a"));
    }

    #[test]
    fn test_dedup_keeps_first_seen() {
        let bindings = vec![
            own("a", "1.0.0"),
            HookBinding::absent("a"),
            own("a", "2.0.0"),
            HookBinding::absent("a"),
        ];

        let unique = dedup(bindings);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].package.as_ref().unwrap().version, "1.0.0");
        assert!(!unique[1].has_own_package);
    }

    #[test]
    fn test_no_winner_leaves_absent_claims_empty() {
        let unified = unify(vec![HookBinding::absent("root"), HookBinding::absent("a")]);
        assert!(unified.iter().all(|b| b.package.is_none() && b.inherited_from.is_none()));
    }

    #[test]
    fn test_unify_is_idempotent() {
        let once = unify(vec![HookBinding::absent("root"), own("a", "1.2.0"), own("b", "1.3.0")]);
        let twice = unify(once.clone());
        assert_eq!(once, twice);
    }
}
