//! Shared test utilities for integration and E2E tests.
//!
//! Fixtures here build a tiny multi-project world on the local filesystem:
//! every "remote" is a directory or a `.tar.gz` reached through a `file://`
//! URL, so the default transport can resolve it without network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest("kodjin.infra", manifests::EMPTY);
//!     fixture.command().arg("resolve").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    #[allow(unused_imports)]
    pub use super::{file_url, sha256_hex, tar_gz};
    pub use super::TestFixture;
}

/// Manifest snippets for testing.
#[allow(dead_code)]
pub mod manifests {
    /// A manifest with nothing in it.
    pub const EMPTY: &str = "# nothing to resolve\n";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "dependencies: [unclosed";

    /// An inventory version that is not semver.
    pub const BAD_TOOL_VERSION: &str = r#"
inventory:
  tools:
    terraform:
      version: latest
      url: https://releases.example.com/terraform
"#;
}

/// Build an in-memory `.tar.gz` from `(path, content)` pairs.
#[allow(dead_code)]
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("Failed to finish archive")
}

/// `file://` URL for an absolute path.
#[allow(dead_code)]
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .expect("fixture paths are absolute")
        .to_string()
}

/// Lowercase hex SHA-256 of `data`.
#[allow(dead_code)]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A temporary world holding project manifests and published artifacts.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `<project>/project.yaml`.
    pub fn with_manifest(self, project: &str, content: &str) -> Self {
        self.temp_dir
            .child(project)
            .child("project.yaml")
            .write_str(content)
            .expect("Failed to write manifest");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a binary file with the given path and content.
    #[allow(dead_code)]
    pub fn with_binary_file(self, path: &str, content: &[u8]) -> Self {
        self.temp_dir
            .child(path)
            .write_binary(content)
            .expect("Failed to write binary file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `file://` URL of a path inside the fixture.
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        file_url(&self.path().join(path))
    }

    /// Path of `<project>/project.yaml`.
    pub fn manifest_path(&self, project: &str) -> PathBuf {
        self.path().join(project).join("project.yaml")
    }

    /// Default workspace of `project`.
    #[allow(dead_code)]
    pub fn workspace(&self, project: &str) -> PathBuf {
        self.path().join(project).join(".PROJECT")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in `project`'s directory.
    pub fn command(&self, project: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("tenant-resolver");
        cmd.current_dir(self.path().join(project))
            .env_remove("TENANT_RESOLVER_MANIFEST")
            .env_remove("TENANT_RESOLVER_WORKSPACE")
            .env_remove("TENANT_RESOLVER_TENANT")
            .env_remove("TENANT_RESOLVER_TOKEN")
            .env_remove("TENANT_RESOLVER_ARTIFACT_MODE");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_manifest() {
        let fixture = TestFixture::new().with_manifest("kodjin.infra", manifests::EMPTY);
        assert!(fixture.manifest_path("kodjin.infra").is_file());
    }

    #[test]
    fn test_file_url_round_trips() {
        let fixture = TestFixture::new().with_file("a/b.txt", "x");
        let url = url::Url::parse(&fixture.url("a/b.txt")).unwrap();
        assert_eq!(url.to_file_path().unwrap(), fixture.path().join("a/b.txt"));
    }

    #[test]
    fn test_tar_gz_is_gzip() {
        let data = tar_gz(&[("a", "1")]);
        assert_eq!(&data[..2], &[0x1f, 0x8b]);
    }
}
