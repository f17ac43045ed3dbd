//! Versioned packages, the unit of everything the resolver materializes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::path::escape_version;

/// One named, versioned artifact: a dependency, cluster provider, helm
/// plugin, hook package, or tool.
///
/// Identity is `name` within a category. Only `resolved_path` and
/// `local_artifacts` change after parsing, once a transfer succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedPackage {
    pub name: String,
    pub version: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Object-storage URL used in artifact mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_artifacts: Vec<String>,
    /// Store a single-file artifact under the package name.
    #[serde(default)]
    pub rename: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<PathBuf>,
}

impl VersionedPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
            checksum: None,
            artifact_url: None,
            local_artifacts: Vec::new(),
            rename: false,
            resolved_path: None,
        }
    }

    /// `<name>-<version>` with slashes in the version replaced by underscores.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, escape_version(&self.version))
    }

    /// The destination directory of this package under `root`.
    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(self.dir_name())
    }

    /// The owning tenant: the first dot-separated label of the name.
    pub fn tenant(&self) -> &str {
        tenant_of(&self.name)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path
            .as_ref()
            .is_some_and(|path| !path.as_os_str().is_empty())
    }
}

impl fmt::Display for VersionedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// The tenant prefix of a package or directory name.
pub fn tenant_of(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Inventory categories that are reconciled across manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Clusters,
    HelmPlugins,
    Tools,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Clusters, Category::HelmPlugins, Category::Tools];

    /// The manifest section name.
    pub fn section(&self) -> &'static str {
        match self {
            Category::Clusters => "clusters",
            Category::HelmPlugins => "helm-plugins",
            Category::Tools => "tools",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// One inventory category: name to package.
pub type PackageMap = BTreeMap<String, VersionedPackage>;
