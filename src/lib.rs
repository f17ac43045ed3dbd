//! # Tenant Resolver Library
//!
//! This library turns a declarative project manifest (`project.yaml`) into a
//! materialized local workspace: nested infrastructure repositories, shared
//! inventory (clusters, helm plugins, hooks, tools), and downloaded artifacts.
//! It is used by the `tenant-resolver` command-line tool but can be embedded
//! anywhere a workspace needs resolving.
//!
//! ## Quick Example
//!
//! ```
//! use tenant_resolver::config;
//! use tenant_resolver::package::Category;
//!
//! let manifest = config::parse_for_os(r#"
//! dependencies:
//!   - name: deps.infra
//!     version: v1.0.0
//!     url: git::https://example.com/{{.Name}}.git?ref={{.Version}}
//! inventory:
//!   tools:
//!     terraform:
//!       version: 1.5.0
//!       os:
//!         linux: {url: "https://releases.example.com/terraform_linux"}
//! "#, "linux").unwrap();
//!
//! assert_eq!(manifest.dependencies[0].url, "git::https://example.com/deps.infra.git?ref=v1.0.0");
//! assert_eq!(manifest.inventory.category(Category::Tools)["terraform"].version, "1.5.0");
//! ```
//!
//! ## Core Concepts
//!
//! - **Packages (`package`)**: [`package::VersionedPackage`] is the unit of
//!   everything resolved, materialized as `<root>/<name>-<version>/`.
//! - **Manifests (`config`)**: The `project.yaml` schema and its parser.
//! - **Transfers (`transfer`, `transport`, `git`, `object_storage`)**: Fetching
//!   one package through a version-control checkout, a plain download, or an
//!   object-storage artifact, with cancellation and progress.
//! - **Phases (`phases`)**: Discovery to a fixed point, inventory
//!   reconciliation, hook unification, garbage collection, and
//!   materialization.
//!
//! ## Execution Flow
//!
//! [`phases::orchestrator::resolve`] runs:
//!
//! 1.  **Discovery**: Transfer dependencies and read their nested manifests
//!     until no new dependency appears, reconciling their inventory.
//! 2.  **Hook unification**: Give every tenant without its own hook package the
//!     highest-versioned one declared.
//! 3.  **Garbage collection**: Delete unreferenced hook directories.
//! 4.  **Materialization**: Transfer hooks, clusters, and tools.
//! 5.  **State**: Write `resolved.yaml` atomically.
//!
//! A workspace has a single writer. Re-running after a failure resumes: every
//! transfer whose destination already exists is skipped.

pub mod archive;
pub mod cancel;
pub mod config;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod object_storage;
pub mod package;
pub mod path;
pub mod phases;
pub mod progress;
pub mod suggestions;
pub mod transfer;
pub mod transport;
pub mod version;
