//! # Error Suggestions
//!
//! Helpers that turn resolution failures into messages saying what went wrong
//! AND how to fix it. The binary routes every library error through
//! [`explain`] before printing it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tenant_resolver::suggestions;
//!
//! if !manifest.exists() {
//!     return Err(suggestions::manifest_not_found(&manifest));
//! }
//! let resolution = orchestrator::resolve_file(..).map_err(suggestions::explain)?;
//! ```

use std::path::Path;

use crate::error::{Error, TransferKind};

/// Generate an error for when the root manifest is not found.
///
/// Includes hints about:
/// - Creating a `project.yaml`
/// - Using the -m/--manifest flag
/// - Using the TENANT_RESOLVER_MANIFEST environment variable
pub fn manifest_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Manifest not found: {path}\n\n\
         hint: Create a project.yaml in your project root\n\
         hint: Use -m/--manifest to specify a different path\n\
         hint: Set TENANT_RESOLVER_MANIFEST environment variable",
        path = path.display()
    )
}

/// Generate an error for a cycle detected between dependencies.
pub fn cycle_detected(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cycle detected in dependencies: {cycle}\n\n\
         hint: Remove one of the dependencies on the cycle from its project.yaml\n\
         hint: Move what both projects share into a separate dependency"
    )
}

/// Generate an error for an interrupted transfer.
pub fn interrupted(name: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Resolution interrupted while transferring {name}\n\n\
         hint: Run resolve again; packages already in the workspace are skipped"
    )
}

/// Generate an error for an invalid `--exclude` pattern.
pub fn invalid_exclude(error: &glob::PatternError) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid exclude pattern: {error}\n\n\
         hint: Use * for single path component, ** for recursive matching\n\
         hint: Patterns match archive entry paths and every parent directory"
    )
}

/// The hint printed under a transfer failure of `kind`.
pub fn transfer_hint(kind: TransferKind) -> &'static str {
    match kind {
        TransferKind::NotFound => {
            "hint: Check that the URL exists and the ref or version it names was published"
        }
        TransferKind::PermissionDenied => {
            "hint: Pass a token with --token or TENANT_RESOLVER_TOKEN"
        }
        TransferKind::CredentialsExpired => "hint: Refresh the token and run resolve again",
        TransferKind::MalformedUrl => {
            "hint: Check the url in project.yaml; version-control sources start with git::"
        }
    }
}

/// Attach hints to a library error.
pub fn explain(error: Error) -> anyhow::Error {
    match error {
        Error::CycleDetected { cycle } => cycle_detected(&cycle),
        Error::Interrupted { name } => interrupted(&name),
        Error::Glob(ref pattern) => invalid_exclude(pattern),
        Error::Transfer { kind, .. } => {
            let hint = transfer_hint(kind);
            anyhow::anyhow!("{error}\n{hint}")
        }
        Error::ChecksumMismatch { .. } => anyhow::anyhow!(
            "{error}\n\nhint: Update the checksum in project.yaml if the artifact was republished"
        ),
        other => other.into(),
    }
}
