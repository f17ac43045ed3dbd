//! Orchestrator for a complete resolution run
//!
//! This module coordinates all phases behind [`resolve`] and [`resolve_file`],
//! and owns the run configuration ([`ResolverConfig`]) and result
//! ([`ResolvedWorkspace`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use super::discovery::DependencyWalker;
use super::{gc, hooks, materialize, HookBinding};
use crate::cancel::CancellationToken;
use crate::config::ManifestDocument;
use crate::defaults::{INVENTORY_DIR, STATE_FILE};
use crate::error::Result;
use crate::package::{PackageMap, VersionedPackage};
use crate::path::ExcludeSet;
use crate::progress::ProgressPool;
use crate::transfer::{ArtifactTransfer, TransferOptions};
use crate::transport::Transport;

/// Directories of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub dependencies: PathBuf,
    pub clusters: PathBuf,
    pub hooks: PathBuf,
    pub tools: PathBuf,
    pub inventory: PathBuf,
}

impl WorkspaceLayout {
    /// The standard layout under `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let inventory = root.join(INVENTORY_DIR);
        Self {
            dependencies: root.join("dependencies"),
            clusters: root.join("clusters"),
            hooks: inventory.join("hooks"),
            tools: root.join("tools"),
            inventory,
            root,
        }
    }

    /// Path of the state file written after a successful run.
    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }
}

/// Configuration of one run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// The root tenant.
    pub tenant: String,
    pub layout: WorkspaceLayout,
    /// Opaque token embedded in version-control URLs.
    pub token: Option<String>,
    /// Try object storage before each package's primary source.
    pub artifact_mode: bool,
    /// Render progress indicators for plain transfers.
    pub progress: bool,
    /// Glob patterns of archive entries to skip.
    pub exclude: Vec<String>,
    /// Operating system used to select tool sources.
    pub os: String,
}

impl ResolverConfig {
    pub fn new(tenant: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            tenant: tenant.into(),
            layout: WorkspaceLayout::under(workspace_root),
            token: None,
            artifact_mode: false,
            progress: false,
            exclude: Vec::new(),
            os: std::env::consts::OS.to_string(),
        }
    }

    /// Transfer options for this configuration.
    pub fn transfer_options(&self, cancel: CancellationToken) -> Result<TransferOptions> {
        Ok(TransferOptions {
            token: self.token.clone(),
            artifact_mode: self.artifact_mode,
            exclude: ExcludeSet::new(self.exclude.as_slice())?,
            progress: self.progress.then(ProgressPool::new),
            cancel,
            inventory_dir: Some(self.layout.inventory.clone()),
        })
    }
}

/// The resolved state of a workspace, written to the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWorkspace {
    pub tenant: String,
    pub dependencies: Vec<VersionedPackage>,
    pub clusters: PackageMap,
    pub helm_plugins: PackageMap,
    pub tools: PackageMap,
    pub hooks: Vec<HookBinding>,
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub workspace: ResolvedWorkspace,
    /// Packages fetched during this run, as `name@version`.
    pub fetched: Vec<String>,
    /// Hook directories removed by garbage collection.
    pub removed: Vec<PathBuf>,
}

/// Execute a complete resolution run
///
/// This orchestrates:
/// 1. Discovery to the fixed point (dependency transfers and reconciliation)
/// 2. Hook unification
/// 3. Garbage collection of unreferenced hook directories
/// 4. Transfers of hooks, clusters, and tools
/// 5. Writing the state file
///
/// Any error aborts the run. Directories already materialized stay in place
/// and are skipped by the next run.
pub fn resolve(
    root: &ManifestDocument,
    config: &ResolverConfig,
    transfer: &ArtifactTransfer,
) -> Result<Resolution> {
    let layout = &config.layout;

    // Phase 1: Discovery
    let walker = DependencyWalker::new(transfer, &layout.dependencies, &config.os);
    let mut session = walker.walk(&config.tenant, root)?;

    // Phase 2: Hook unification
    session.bindings = hooks::unify(std::mem::take(&mut session.bindings));

    // Phase 3: Garbage collection
    let removed = gc::collect(&layout.hooks, &session.bindings)?;

    // Phase 4: Materialization
    materialize::hooks(&mut session, transfer, &layout.hooks)?;
    materialize::category(
        &mut session.inventory.clusters,
        &mut session.fetched,
        transfer,
        &layout.clusters,
    )?;
    materialize::category(
        &mut session.inventory.tools,
        &mut session.fetched,
        transfer,
        &layout.tools,
    )?;

    let workspace = ResolvedWorkspace {
        tenant: session.tenant,
        dependencies: session.dependencies,
        clusters: session.inventory.clusters,
        helm_plugins: session.inventory.helm_plugins,
        tools: session.inventory.tools,
        hooks: session.bindings,
    };

    // Phase 5: State file
    write_state(&layout.state_file(), &workspace)?;
    info!(
        "Resolved {} dependencies for {} ({} fetched)",
        workspace.dependencies.len(),
        workspace.tenant,
        session.fetched.len()
    );

    Ok(Resolution {
        workspace,
        fetched: session.fetched,
        removed,
    })
}

/// Read the manifest at `manifest_path` and resolve it through `transport`.
pub fn resolve_file(
    manifest_path: &Path,
    config: &ResolverConfig,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) -> Result<Resolution> {
    let root = crate::config::from_file_for_os(manifest_path, &config.os)?;
    let transfer = ArtifactTransfer::new(transport, config.transfer_options(cancel)?);
    resolve(&root, config, &transfer)
}

/// Load the state file written by the last successful run, if any.
pub fn load_state(layout: &WorkspaceLayout) -> Result<Option<ResolvedWorkspace>> {
    let path = layout.state_file();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(Some(serde_yaml::from_str(&content)?))
}

fn write_state(path: &Path, workspace: &ResolvedWorkspace) -> Result<()> {
    let yaml = serde_yaml::to_string(workspace)?;
    crate::filesystem::write_atomic(path, yaml.as_bytes())
}
