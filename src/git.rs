//! Version-control checkouts.
//!
//! A package URL prefixed with `git::` is checked out rather than downloaded.
//! The reference to check out comes from the URL's `ref` query parameter, and a
//! fetch depth of 1 is always injected: a URL that already carries `depth` is
//! rejected, because a dependency must pin a reference, not a depth.

use std::fs;
use std::path::Path;
use std::process::Command;

use url::Url;

use crate::error::{Dialect, Error, Result, TransferKind};

/// Marker prefix selecting the version-control dialect.
pub const VCS_PREFIX: &str = "git::";

/// Depth injected into every checkout.
pub const CHECKOUT_DEPTH: u32 = 1;

/// True if `url` selects the version-control dialect.
pub fn is_vcs_url(url: &str) -> bool {
    url.starts_with(VCS_PREFIX)
}

/// A fully prepared checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Remote without the `ref`/`depth` query, with credentials when a token is set.
    pub remote: Url,
    /// Branch, tag, or commit to check out. `None` means the default branch.
    pub reference: Option<String>,
    pub depth: u32,
}

impl CheckoutRequest {
    /// Build a checkout from a `git::` URL.
    ///
    /// `name` identifies the package in errors. `token`, when present, is
    /// embedded as the remote's user-info.
    pub fn from_url(name: &str, raw: &str, token: Option<&str>) -> Result<Self> {
        let stripped = raw.strip_prefix(VCS_PREFIX).unwrap_or(raw);
        let url = Url::parse(stripped).map_err(|e| Error::Transfer {
            dialect: Dialect::VersionControl,
            kind: TransferKind::MalformedUrl,
            name: name.to_string(),
            url: stripped.to_string(),
            message: e.to_string(),
        })?;

        let mut reference = None;
        let mut passthrough = Vec::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "depth" => {
                    return Err(Error::manifest(
                        name,
                        format!(
                            "URL {} specifies a depth; pin a reference with ?ref= instead",
                            stripped
                        ),
                    ))
                }
                "ref" => reference = Some(value.into_owned()),
                _ => passthrough.push((key.into_owned(), value.into_owned())),
            }
        }

        let mut remote = url.clone();
        remote.set_query(None);
        if !passthrough.is_empty() {
            remote.query_pairs_mut().extend_pairs(passthrough);
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            if remote.set_username(token).is_err() {
                return Err(Error::Transfer {
                    dialect: Dialect::VersionControl,
                    kind: TransferKind::MalformedUrl,
                    name: name.to_string(),
                    url: stripped.to_string(),
                    message: "URL cannot carry credentials".to_string(),
                });
            }
        }

        Ok(Self {
            remote,
            reference,
            depth: CHECKOUT_DEPTH,
        })
    }

    /// The remote with credentials removed, for logs and errors.
    pub fn redacted(&self) -> String {
        let mut url = self.remote.clone();
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.to_string()
    }

    /// The `git` arguments for this checkout into `target_dir`.
    pub fn clone_args(&self, target_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "clone".to_string(),
            format!("--depth={}", self.depth),
        ];
        if let Some(reference) = &self.reference {
            args.push("--branch".to_string());
            args.push(reference.clone());
        }
        args.push(self.remote.to_string());
        args.push(target_dir.display().to_string());
        args
    }
}

/// Shallow-clone `request` into `target_dir` with the system `git` command.
///
/// This uses the system git command, which automatically handles SSH keys,
/// credential helpers, and anything configured in ~/.gitconfig.
pub fn clone_shallow(name: &str, request: &CheckoutRequest, target_dir: &Path) -> Result<()> {
    // git won't clone into an existing non-empty dir
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("git")
        .args(request.clone_args(target_dir))
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| Error::Transfer {
            dialect: Dialect::VersionControl,
            kind: TransferKind::NotFound,
            name: name.to_string(),
            url: request.redacted(),
            message: format!("failed to run git: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Transfer {
            dialect: Dialect::VersionControl,
            kind: classify_stderr(&stderr),
            name: name.to_string(),
            url: request.redacted(),
            message: stderr.trim().to_string(),
        });
    }

    // The checkout is a snapshot; history is never consulted.
    let git_dir = target_dir.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(git_dir)?;
    }
    Ok(())
}

/// Map git's stderr onto a [`TransferKind`].
pub fn classify_stderr(stderr: &str) -> TransferKind {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("expired") || lower.contains("bad credentials") {
        TransferKind::CredentialsExpired
    } else if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("could not read username")
        || lower.contains("403")
    {
        TransferKind::PermissionDenied
    } else if lower.contains("not found")
        || lower.contains("does not exist")
        || lower.contains("could not find remote branch")
        || lower.contains("not a git repository")
    {
        TransferKind::NotFound
    } else if lower.contains("unsupported protocol")
        || lower.contains("malformed")
        || lower.contains("invalid url")
        || lower.contains("could not resolve host")
    {
        TransferKind::MalformedUrl
    } else {
        TransferKind::NotFound
    }
}
