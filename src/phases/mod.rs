//! Phases of a resolution run.
//!
//! ## Overview
//!
//! A run turns one root manifest into a materialized workspace:
//! 1. Discovery - Transfer dependencies, read their nested manifests, and fold
//!    their inventory into the session until no new dependency appears
//!    ([`discovery`], [`reconcile`])
//! 2. Hook unification - Pick one hook package for every tenant without its own
//!    ([`hooks`])
//! 3. Garbage collection - Remove hook directories no binding references ([`gc`])
//! 4. Materialization - Transfer hooks, clusters, and tools ([`materialize`])
//!
//! [`orchestrator::resolve`] runs them in that order. All state of a run lives
//! in a [`ResolutionSession`] threaded through the phases, so two runs never
//! share anything but the filesystem.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{Inventory, ManifestDocument};
use crate::package::{Category, VersionedPackage};
use crate::transfer::TransferOutcome;

pub mod discovery;
pub mod gc;
pub mod hooks;
pub mod materialize;
pub mod orchestrator;
pub mod reconcile;

/// Inventory keys known before any nested manifest was read.
///
/// Captured once per run and never mutated. Keys in the snapshot are frozen
/// at their initial version for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    clusters: BTreeSet<String>,
    helm_plugins: BTreeSet<String>,
    tools: BTreeSet<String>,
}

impl SessionSnapshot {
    pub fn capture(inventory: &Inventory) -> Self {
        let keys = |category| inventory.category(category).keys().cloned().collect();
        Self {
            clusters: keys(Category::Clusters),
            helm_plugins: keys(Category::HelmPlugins),
            tools: keys(Category::Tools),
        }
    }

    pub fn keys(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Clusters => &self.clusters,
            Category::HelmPlugins => &self.helm_plugins,
            Category::Tools => &self.tools,
        }
    }

    pub fn contains(&self, category: Category, key: &str) -> bool {
        self.keys(category).contains(key)
    }
}

/// One tenant's claim, or lack of claim, on a hook package.
///
/// Two bindings are duplicates when `owning_tenant` and `has_own_package`
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookBinding {
    pub owning_tenant: String,
    pub has_own_package: bool,
    /// Tenant whose package this binding inherited during unification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    /// `None` for an absent claim that nothing could be inherited for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<VersionedPackage>,
}

impl HookBinding {
    /// A tenant declaring its own hook package.
    pub fn own(tenant: impl Into<String>, package: VersionedPackage) -> Self {
        Self {
            owning_tenant: tenant.into(),
            has_own_package: true,
            inherited_from: None,
            package: Some(package),
        }
    }

    /// A tenant with dependencies but no hook package of its own.
    pub fn absent(tenant: impl Into<String>) -> Self {
        Self {
            owning_tenant: tenant.into(),
            has_own_package: false,
            inherited_from: None,
            package: None,
        }
    }

    /// Binding for a manifest: its own highest hook package, or an absent claim.
    pub fn for_manifest(tenant: &str, manifest: &ManifestDocument) -> Self {
        match manifest.hook_package() {
            Some(package) => Self::own(tenant, package.clone()),
            None => Self::absent(tenant),
        }
    }

    pub fn key(&self) -> (&str, bool) {
        (&self.owning_tenant, self.has_own_package)
    }

    /// Hook directory this binding refers to under `hooks_root`.
    pub fn destination(&self, hooks_root: &Path) -> Option<PathBuf> {
        self.package
            .as_ref()
            .map(|package| package.destination(hooks_root))
    }
}

/// Mutable state of one resolution run.
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    /// The root tenant.
    pub tenant: String,
    pub snapshot: SessionSnapshot,
    /// Running inventory: the root's declarations plus everything reconciled in.
    pub inventory: Inventory,
    pub bindings: Vec<HookBinding>,
    /// Every dependency resolved so far, in discovery order.
    pub dependencies: Vec<VersionedPackage>,
    /// Packages actually fetched during this run, as `name@version`.
    pub fetched: Vec<String>,
}

impl ResolutionSession {
    /// Start a run from the root manifest.
    ///
    /// The snapshot is taken from the root's inventory. The root binding is
    /// seeded from its own hooks, or as an absent claim if it has dependencies
    /// but no hooks.
    pub fn new(tenant: impl Into<String>, root: &ManifestDocument) -> Self {
        let tenant = tenant.into();
        let mut bindings = Vec::new();
        if let Some(package) = root.hook_package() {
            bindings.push(HookBinding::own(tenant.clone(), package.clone()));
        } else if !root.dependencies.is_empty() {
            bindings.push(HookBinding::absent(tenant.clone()));
        }

        Self {
            snapshot: SessionSnapshot::capture(&root.inventory),
            inventory: root.inventory.clone(),
            bindings,
            dependencies: Vec::new(),
            fetched: Vec::new(),
            tenant,
        }
    }

    pub fn record(&mut self, package: &VersionedPackage, outcome: TransferOutcome) {
        if let TransferOutcome::Fetched(_) = outcome {
            self.fetched.push(package.to_string());
        }
    }

    pub fn dependency(&self, name: &str) -> Option<&VersionedPackage> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }
}
