//! Removal of hook directories that no binding references.
//!
//! Runs exactly once per resolution, after hook unification and before any
//! hook is transferred.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use super::HookBinding;
use crate::error::Result;

/// Delete every directory under `hooks_root` that `bindings` does not refer to.
///
/// Returns the removed directories. A missing `hooks_root` is a no-op.
pub fn collect(hooks_root: &Path, bindings: &[HookBinding]) -> Result<Vec<PathBuf>> {
    let referenced: HashSet<PathBuf> = bindings
        .iter()
        .filter_map(|binding| binding.destination(hooks_root))
        .collect();

    let mut removed = Vec::new();
    for dir in crate::filesystem::list_dirs(hooks_root)? {
        if referenced.contains(&dir) {
            continue;
        }
        warn!("Removing unreferenced hook directory {}", dir.display());
        fs::remove_dir_all(&dir)?;
        removed.push(dir);
    }
    Ok(removed)
}
