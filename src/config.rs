//! # Manifest Schema and Parsing
//!
//! This module defines the structures that represent a project manifest
//! (`project.yaml`) and the logic that turns one into a [`ManifestDocument`].
//!
//! ## Format
//!
//! ```yaml
//! dependencies:
//!   - name: deps.bootstrap.infra
//!     version: v0.3.0
//!     url: git::https://github.com/org/{{.Name}}.git?ref={{.Version}}
//! inventory:
//!   clusters:
//!     aws.provider:
//!       version: v2.0.0
//!       url: git::https://github.com/org/aws.provider.git?ref=v2.0.0
//!   helm-plugins:
//!     diff:
//!       version: v3.6.0
//!       url: https://github.com/databus23/helm-diff
//!   hooks:
//!     kodjin.hooks:
//!       version: v1.2.0
//!       url: git::https://github.com/org/kodjin.hooks.git?ref=v1.2.0
//!   tools:
//!     terraform:
//!       version: 1.0.2
//!       rename: true
//!       os:
//!         linux:
//!           url: https://releases.example.com/terraform_linux.tar.gz
//!           checksum: sha256:...
//! spec:
//!   environments: [develop, production]
//! ```
//!
//! ## Parsing rules
//!
//! - Every inventory `version` must be a semantic version; a failure names the
//!   offending section.
//! - Dependency versions are references and may be any non-empty string.
//! - `{{.Name}}` / `{{.Version}}` placeholders in URLs are expanded.
//! - A tool's URL and checksum come from its `os` entry for the target OS when
//!   no top-level `url` is given.
//!
//! The document is immutable once parsed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package::{Category, PackageMap, VersionedPackage};
use crate::path::expand_url_template;

/// A dependency entry as written under `dependencies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDependency {
    name: String,
    version: String,
    url: String,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default, rename = "artifact-url")]
    artifact_url: Option<String>,
}

/// An OS-specific source for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawOsSource {
    url: String,
    #[serde(default)]
    checksum: Option<String>,
}

/// An inventory entry; the key in its section is the package name.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPackage {
    version: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default, rename = "artifact-url")]
    artifact_url: Option<String>,
    #[serde(default)]
    rename: bool,
    #[serde(default)]
    os: BTreeMap<String, RawOsSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawInventory {
    #[serde(default)]
    clusters: BTreeMap<String, RawPackage>,
    #[serde(default, rename = "helm-plugins")]
    helm_plugins: BTreeMap<String, RawPackage>,
    #[serde(default)]
    hooks: BTreeMap<String, RawPackage>,
    #[serde(default)]
    tools: BTreeMap<String, RawPackage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawManifest {
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    inventory: RawInventory,
    #[serde(default)]
    spec: ProjectSpec,
}

/// The `spec` section. Carried through for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
}

/// Parsed inventory of one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub clusters: PackageMap,
    pub helm_plugins: PackageMap,
    pub hooks: PackageMap,
    pub tools: PackageMap,
}

impl Inventory {
    /// The map for a reconciled category.
    pub fn category(&self, category: Category) -> &PackageMap {
        match category {
            Category::Clusters => &self.clusters,
            Category::HelmPlugins => &self.helm_plugins,
            Category::Tools => &self.tools,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut PackageMap {
        match category {
            Category::Clusters => &mut self.clusters,
            Category::HelmPlugins => &mut self.helm_plugins,
            Category::Tools => &mut self.tools,
        }
    }
}

/// One project's declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDocument {
    pub dependencies: Vec<VersionedPackage>,
    pub inventory: Inventory,
    pub spec: ProjectSpec,
}

impl ManifestDocument {
    /// The highest-versioned hook package this manifest declares, if any.
    pub fn hook_package(&self) -> Option<&VersionedPackage> {
        let mut best: Option<&VersionedPackage> = None;
        for hook in self.inventory.hooks.values() {
            match best {
                Some(current) if !crate::version::is_newer(&hook.version, &current.version) => {}
                _ => best = Some(hook),
            }
        }
        best
    }
}

/// Parse a manifest for the host OS.
pub fn parse(yaml_content: &str) -> Result<ManifestDocument> {
    parse_for_os(yaml_content, std::env::consts::OS)
}

/// Parse a manifest, selecting tool sources for `os`.
pub fn parse_for_os(yaml_content: &str, os: &str) -> Result<ManifestDocument> {
    let raw: RawManifest = if yaml_content.trim().is_empty() {
        RawManifest::default()
    } else {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::manifest("manifest", e.to_string()))?
    };

    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    for dep in raw.dependencies {
        dependencies.push(convert_dependency(dep)?);
    }

    let inventory = Inventory {
        clusters: convert_section(Category::Clusters.section(), raw.inventory.clusters, os)?,
        helm_plugins: convert_section(
            Category::HelmPlugins.section(),
            raw.inventory.helm_plugins,
            os,
        )?,
        hooks: convert_section("hooks", raw.inventory.hooks, os)?,
        tools: convert_section(Category::Tools.section(), raw.inventory.tools, os)?,
    };

    Ok(ManifestDocument {
        dependencies,
        inventory,
        spec: raw.spec,
    })
}

/// Read and parse a manifest file for the host OS.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ManifestDocument> {
    from_file_for_os(path, std::env::consts::OS)
}

/// Read and parse a manifest file, selecting tool sources for `os`.
pub fn from_file_for_os<P: AsRef<Path>>(path: P, os: &str) -> Result<ManifestDocument> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::manifest(path.display().to_string(), e.to_string()))?;
    parse_for_os(&content, os).map_err(|e| match e {
        Error::Manifest {
            source_name,
            message,
        } => Error::manifest(
            format!("{} ({})", path.display(), source_name),
            message,
        ),
        other => other,
    })
}

fn convert_dependency(dep: RawDependency) -> Result<VersionedPackage> {
    if dep.name.trim().is_empty() {
        return Err(Error::manifest("dependencies", "dependency without a name"));
    }
    validate_name("dependencies", &dep.name)?;
    if dep.version.trim().is_empty() {
        return Err(Error::manifest(
            "dependencies",
            format!("dependency {} has an empty version", dep.name),
        ));
    }
    let url = expand_url_template(&dep.url, &dep.name, &dep.version);
    let artifact_url = dep
        .artifact_url
        .map(|u| expand_url_template(&u, &dep.name, &dep.version));
    let mut pkg = VersionedPackage::new(dep.name, dep.version, url);
    pkg.checksum = dep.checksum;
    pkg.artifact_url = artifact_url;
    Ok(pkg)
}

/// A package name becomes a single directory under the workspace root.
fn validate_name(section: &str, name: &str) -> Result<()> {
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(Error::manifest(
            section,
            format!("'{}' is not a valid package name", name),
        ));
    }
    Ok(())
}

fn convert_section(
    section: &str,
    entries: BTreeMap<String, RawPackage>,
    os: &str,
) -> Result<PackageMap> {
    let mut map = PackageMap::new();
    for (name, raw) in entries {
        validate_name(section, &name)?;
        crate::version::validate(section, &name, &raw.version)?;

        let (url, checksum) = match (raw.url, raw.os.get(os)) {
            (Some(url), _) => (url, raw.checksum),
            (None, Some(source)) => (
                source.url.clone(),
                source.checksum.clone().or(raw.checksum),
            ),
            (None, None) => {
                return Err(Error::manifest(
                    section,
                    format!("{} has no url and no source for OS '{}'", name, os),
                ))
            }
        };

        let mut pkg = VersionedPackage::new(
            name.clone(),
            raw.version.clone(),
            expand_url_template(&url, &name, &raw.version),
        );
        pkg.checksum = checksum;
        pkg.artifact_url = raw
            .artifact_url
            .map(|u| expand_url_template(&u, &name, &raw.version));
        pkg.rename = raw.rename;
        map.insert(name, pkg);
    }
    Ok(map)
}
