//! Materialization of the final inventory.
//!
//! Runs after unification and garbage collection. Hook packages are
//! transferred once per distinct package, then clusters and tools. Helm
//! plugins are reconciled but never transferred: installing them is the Helm
//! collaborator's job.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use super::ResolutionSession;
use crate::error::Result;
use crate::package::{PackageMap, VersionedPackage};
use crate::transfer::ArtifactTransfer;

/// Transfer every hook package the bindings refer to into `hooks_root`.
pub fn hooks(session: &mut ResolutionSession, transfer: &ArtifactTransfer, hooks_root: &Path) -> Result<()> {
    let mut resolved: HashMap<String, VersionedPackage> = HashMap::new();

    for index in 0..session.bindings.len() {
        let Some(package) = session.bindings[index].package.clone() else {
            continue;
        };
        let dir_name = package.dir_name();
        let package = match resolved.get(&dir_name) {
            Some(done) => done.clone(),
            None => {
                let mut package = package;
                let outcome = transfer.transfer(&mut package, hooks_root)?;
                session.record(&package, outcome);
                resolved.insert(dir_name, package.clone());
                package
            }
        };
        session.bindings[index].package = Some(package);
    }
    debug!("{} hook packages in place", resolved.len());
    Ok(())
}

/// Transfer every package of `packages` into `root`.
pub fn category(
    packages: &mut PackageMap,
    fetched: &mut Vec<String>,
    transfer: &ArtifactTransfer,
    root: &Path,
) -> Result<()> {
    for package in packages.values_mut() {
        if let crate::transfer::TransferOutcome::Fetched(_) = transfer.transfer(package, root)? {
            fetched.push(package.to_string());
        }
    }
    Ok(())
}
