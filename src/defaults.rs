//! Default values for tenant-resolver configuration.
//!
//! This module provides centralized default names and paths used by the
//! library and the CLI, ensuring consistency and avoiding duplication.

use std::path::{Path, PathBuf};

/// Name of the manifest file at the root of every project and dependency.
pub const MANIFEST_FILE: &str = "project.yaml";

/// Name of the workspace directory created beside the root manifest.
pub const WORKSPACE_DIR: &str = ".PROJECT";

/// Name of the state file written after a successful resolution.
pub const STATE_FILE: &str = "resolved.yaml";

/// Name of the inventory subtree merged out of object-storage artifacts.
pub const INVENTORY_DIR: &str = "inventory";

/// Returns the default workspace root for a manifest path.
///
/// The workspace lives beside the manifest: `<manifest dir>/.PROJECT`.
pub fn default_workspace_root(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(WORKSPACE_DIR)
}

/// Returns the default tenant for a manifest path.
///
/// Uses the first dot-separated label of the directory holding the manifest,
/// falling back to the current directory's name.
pub fn default_tenant(manifest: &Path) -> String {
    let dir = match manifest.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => canonical(parent),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.file_name()
        .map(|name| crate::package::tenant_of(&name.to_string_lossy()).to_string())
        .unwrap_or_else(|| "root".to_string())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The default manifest location: `project.yaml` in the current directory.
pub fn default_manifest_path() -> PathBuf {
    PathBuf::from(MANIFEST_FILE)
}
