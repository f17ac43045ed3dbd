//! # Error Handling
//!
//! This module defines the centralized error type for `tenant-resolver`. It
//! uses `thiserror` to build a single `Error` enum covering every failure the
//! resolution engine can surface, plus a `Result<T>` alias used throughout the
//! crate.
//!
//! ## Taxonomy
//!
//! - **`Manifest`**: a manifest is missing, unreadable, or structurally invalid
//!   (including an invalid semantic version in an inventory section, or a
//!   dependency URL that pins a depth instead of a reference).
//! - **`Transfer`**: fetching a package failed. Carries the [`Dialect`] the
//!   transfer used and a [`TransferKind`] classifying the failure.
//! - **`Interrupted`**: an in-flight transfer was cancelled. Kept distinct from
//!   `Transfer` so that callers never retry it.
//! - **`CycleDetected`**: a dependency declares one of its own ancestors.
//!
//! Malformed versions met while reconciling inventory are deliberately not an
//! error: they compare as the lowest possible version (see [`crate::version`]).
//!
//! All errors propagate unwrapped to the caller of
//! [`crate::phases::orchestrator::resolve`]; nothing is retried.

use std::fmt;

use thiserror::Error;

/// The diagnosis appended to every transfer failure.
pub const TRANSFER_DIAGNOSIS: &str = "not found, permission denied, or malformed URL";

/// The source dialect a transfer was attempted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// A `git::` checkout pinned to a reference.
    VersionControl,
    /// HTTP(S) or `file://` download.
    PlainTransport,
    /// Alternate object-storage artifact distribution.
    ObjectStorage,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::VersionControl => write!(f, "version-control"),
            Dialect::PlainTransport => write!(f, "plain-transport"),
            Dialect::ObjectStorage => write!(f, "object-storage"),
        }
    }
}

/// Classification of a transfer failure.
///
/// The plain-transport dialect only ever produces `NotFound` and
/// `MalformedUrl`; the credential kinds come from version-control checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    NotFound,
    PermissionDenied,
    CredentialsExpired,
    MalformedUrl,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::NotFound => write!(f, "not found"),
            TransferKind::PermissionDenied => write!(f, "permission denied"),
            TransferKind::CredentialsExpired => write!(f, "credentials expired"),
            TransferKind::MalformedUrl => write!(f, "malformed URL"),
        }
    }
}

/// Main error type for resolution runs
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest could not be read or is invalid.
    ///
    /// `source_name` names the manifest file, dependency, or section at fault.
    #[error("Manifest error in {source_name}: {message}")]
    Manifest {
        source_name: String,
        message: String,
    },

    /// Fetching a package failed.
    #[error("{dialect} transfer of {name} from {url} failed ({kind}): {message}\n  hint: the source is {}", TRANSFER_DIAGNOSIS)]
    Transfer {
        dialect: Dialect,
        kind: TransferKind,
        name: String,
        url: String,
        message: String,
    },

    /// A transfer was cancelled before it completed.
    #[error("Transfer of {name} interrupted by signal")]
    Interrupted { name: String },

    /// A circular dependency was detected while walking manifests.
    #[error("Cycle detected in dependencies: {cycle}")]
    CycleDetected { cycle: String },

    /// The streamed artifact did not match its declared checksum.
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// An alternate artifact URL is not a recognised object-storage URL.
    #[error("Invalid object-storage URL {url}: {message}")]
    ObjectStorageUrl { url: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for a [`Error::Manifest`].
    pub fn manifest(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Manifest {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Returns true for cancellation, which callers must not retry.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
