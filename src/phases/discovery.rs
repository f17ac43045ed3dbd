//! Discovery: walking the dependency graph to its fixed point.
//!
//! ## Process
//!
//! 1.  **Root transfers**: every dependency the root manifest declares is
//!     transferred into the dependencies root.
//! 2.  **Recursive step**: each dependency's nested manifest
//!     (`<dependency>/project.yaml`) is read. Its clusters, helm plugins, and
//!     tools are reconciled into the session; its hooks seed a binding for the
//!     dependency's tenant (the first label of its name); its own dependencies
//!     are transferred and walked in turn.
//! 3.  **Fixed point**: the walk ends when no reachable dependency is left
//!     unresolved.
//!
//! ## Cycle Detection
//!
//! The walk keeps the chain of dependency names from the root to the current
//! dependency. Reaching a name already on that chain fails with
//! [`Error::CycleDetected`]. Reaching a name resolved on another branch is a
//! diamond, not a cycle: the first sighting is kept.

use std::collections::HashSet;
use std::path::Path;

use log::{debug, warn};

use super::reconcile::reconcile;
use super::{HookBinding, ResolutionSession};
use crate::config::ManifestDocument;
use crate::defaults::MANIFEST_FILE;
use crate::error::{Error, Result};
use crate::package::{Category, VersionedPackage};
use crate::transfer::ArtifactTransfer;

/// Drives transfers and manifest reads for one run.
pub struct DependencyWalker<'a> {
    transfer: &'a ArtifactTransfer,
    dependencies_root: &'a Path,
    os: &'a str,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(transfer: &'a ArtifactTransfer, dependencies_root: &'a Path, os: &'a str) -> Self {
        Self {
            transfer,
            dependencies_root,
            os,
        }
    }

    /// Walk everything reachable from `root`, starting a new session for `tenant`.
    pub fn walk(&self, tenant: &str, root: &ManifestDocument) -> Result<ResolutionSession> {
        let mut session = ResolutionSession::new(tenant, root);

        let mut direct = Vec::with_capacity(root.dependencies.len());
        for dep in &root.dependencies {
            if let Some(known) = session.dependency(&dep.name) {
                warn_conflict(known, dep, tenant);
                continue;
            }
            let resolved = self.fetch(&mut session, dep)?;
            direct.push(resolved.name.clone());
            session.dependencies.push(resolved);
        }

        let mut trail = Trail::default();
        for name in direct {
            if !trail.walked.contains(&name) {
                self.descend(&mut session, &name, &mut trail)?;
            }
        }

        debug!(
            "Discovery reached a fixed point with {} dependencies",
            session.dependencies.len()
        );
        Ok(session)
    }

    /// Read the nested manifest of the resolved dependency `name` and walk
    /// what it declares.
    fn descend(
        &self,
        session: &mut ResolutionSession,
        name: &str,
        trail: &mut Trail,
    ) -> Result<()> {
        let Some(dep) = session.dependency(name).cloned() else {
            return Ok(());
        };
        trail.walked.insert(dep.name.clone());
        let nested = self.read_nested(&dep)?;

        for category in Category::ALL {
            let changed = reconcile(
                category,
                nested.inventory.category(category),
                &session.snapshot,
                session.inventory.category_mut(category),
            );
            if changed > 0 {
                debug!("{} changed {} {} entries", dep, changed, category);
            }
        }
        session
            .bindings
            .push(HookBinding::for_manifest(dep.tenant(), &nested));

        trail.chain.push(dep.name.clone());
        for child in &nested.dependencies {
            if trail.chain.contains(&child.name) {
                let mut cycle = trail.chain.clone();
                cycle.push(child.name.clone());
                return Err(Error::CycleDetected {
                    cycle: cycle.join(" -> "),
                });
            }
            match session.dependency(&child.name) {
                Some(known) => warn_conflict(known, child, &dep.name),
                None => {
                    let resolved = self.fetch(session, child)?;
                    session.dependencies.push(resolved);
                }
            }
            if !trail.walked.contains(&child.name) {
                self.descend(session, &child.name, trail)?;
            }
        }
        trail.chain.pop();
        Ok(())
    }

    fn fetch(&self, session: &mut ResolutionSession, dep: &VersionedPackage) -> Result<VersionedPackage> {
        let mut resolved = dep.clone();
        let outcome = self.transfer.transfer(&mut resolved, self.dependencies_root)?;
        session.record(&resolved, outcome);
        Ok(resolved)
    }

    fn read_nested(&self, dep: &VersionedPackage) -> Result<ManifestDocument> {
        let dir = dep
            .resolved_path
            .clone()
            .unwrap_or_else(|| dep.destination(self.dependencies_root));
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(Error::manifest(
                dep.name.clone(),
                format!("no {} in {}", MANIFEST_FILE, dir.display()),
            ));
        }
        crate::config::from_file_for_os(&path, self.os)
    }
}

/// Names on the path from the root, and names already walked.
#[derive(Debug, Default)]
struct Trail {
    chain: Vec<String>,
    walked: HashSet<String>,
}

fn warn_conflict(known: &VersionedPackage, seen: &VersionedPackage, declared_by: &str) {
    if known.version != seen.version {
        warn!(
            "{} declares {} but {} is already resolved; keeping the first",
            declared_by, seen, known
        );
    }
}
