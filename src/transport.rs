//! # Transport Layer
//!
//! This module separates *how bytes are fetched* from the transfer logic that
//! decides *what* to fetch and *where* it lands. The [`Transport`] trait is the
//! seam: [`crate::transfer::ArtifactTransfer`] only ever talks to a
//! `Transport`, so tests swap in a mock that records calls and writes fixture
//! files instead of touching the network.
//!
//! [`DefaultTransport`] is the production implementation:
//!
//! - **checkout**: the system `git` command (see [`crate::git`]).
//! - **download**: `reqwest` for HTTP(S), the local filesystem for `file://`.
//! - **object storage**: `HEAD` + `GET` against the object's HTTPS endpoint.
//!
//! Every write goes into a staging directory handed in by the caller; moving
//! it into place is the caller's job.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use crate::archive::{expand_tar_gz, is_tar_gz};
use crate::cancel::CancellationToken;
use crate::error::{Dialect, Error, Result, TransferKind};
use crate::git::CheckoutRequest;
use crate::object_storage::ObjectLocation;
use crate::path::ExcludeSet;
use crate::progress::{is_cancellation, CountingReader, ProgressPool};

/// Everything a plain-transport download needs.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub name: String,
    pub url: Url,
    pub checksum: Option<String>,
    /// Store a single-file payload under `name` instead of its URL file name.
    pub rename: bool,
    pub exclude: ExcludeSet,
}

impl DownloadRequest {
    /// The file name a single-file payload is stored under.
    pub fn file_name(&self) -> String {
        if self.rename {
            return self.name.clone();
        }
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Trait for fetch operations - allows mocking in tests
pub trait Transport: Send + Sync {
    /// Check out a version-control source into `dest`.
    fn checkout(&self, name: &str, request: &CheckoutRequest, dest: &Path) -> Result<()>;

    /// Download a plain-transport source into `staging`.
    ///
    /// Must stop promptly once `token` is cancelled.
    fn download(
        &self,
        request: &DownloadRequest,
        staging: &Path,
        token: &CancellationToken,
        progress: Option<&ProgressPool>,
    ) -> Result<()>;

    /// Whether the object exists. `Ok(false)` is "not present", not a failure.
    fn object_exists(&self, location: &ObjectLocation) -> Result<bool>;

    /// Fetch an object-storage archive and expand it into `staging`.
    fn fetch_object(
        &self,
        name: &str,
        location: &ObjectLocation,
        staging: &Path,
        exclude: &ExcludeSet,
        token: &CancellationToken,
    ) -> Result<()>;
}

/// The default implementation of `Transport`.
pub struct DefaultTransport {
    client: Client,
}

impl DefaultTransport {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("tenant-resolver/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn open_http(&self, request: &DownloadRequest) -> Result<(Box<dyn Read + Send>, Option<u64>)> {
        let response = self
            .client
            .get(request.url.clone())
            .send()
            .map_err(|e| {
                let kind = if e.is_builder() {
                    TransferKind::MalformedUrl
                } else {
                    TransferKind::NotFound
                };
                plain_error(request, kind, e.to_string())
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(plain_error(
                request,
                TransferKind::NotFound,
                format!("HTTP {}", status),
            ));
        }
        let length = response.content_length();
        Ok((Box::new(response), length))
    }
}

impl Default for DefaultTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DefaultTransport {
    fn checkout(&self, name: &str, request: &CheckoutRequest, dest: &Path) -> Result<()> {
        crate::git::clone_shallow(name, request, dest)
    }

    fn download(
        &self,
        request: &DownloadRequest,
        staging: &Path,
        token: &CancellationToken,
        progress: Option<&ProgressPool>,
    ) -> Result<()> {
        let (reader, length): (Box<dyn Read + Send>, Option<u64>) = match request.url.scheme() {
            "http" | "https" => self.open_http(request)?,
            "file" => {
                let path = request.url.to_file_path().map_err(|_| {
                    plain_error(request, TransferKind::MalformedUrl, "not a local path")
                })?;
                if !path.exists() {
                    return Err(plain_error(
                        request,
                        TransferKind::NotFound,
                        format!("{} does not exist", path.display()),
                    ));
                }
                if path.is_dir() {
                    if token.is_cancelled() {
                        return Err(Error::Interrupted {
                            name: request.name.clone(),
                        });
                    }
                    crate::filesystem::copy_tree(&path, staging)?;
                    return Ok(());
                }
                let file = File::open(&path)?;
                let length = file.metadata().ok().map(|m| m.len());
                (Box::new(file), length)
            }
            other => {
                return Err(plain_error(
                    request,
                    TransferKind::MalformedUrl,
                    format!("unsupported scheme '{}'", other),
                ))
            }
        };

        let indicator = progress.map(|pool| Arc::new(pool.acquire(&request.name, length)));
        store_payload(request, reader, staging, token, indicator)
    }

    fn object_exists(&self, location: &ObjectLocation) -> Result<bool> {
        let response = self.client.head(location.https_url()).send()?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                debug!("{} is not present ({})", location, response.status());
                Ok(false)
            }
            status => Err(Error::Transfer {
                dialect: Dialect::ObjectStorage,
                kind: TransferKind::NotFound,
                name: location.file_name().to_string(),
                url: location.https_url(),
                message: format!("HTTP {}", status),
            }),
        }
    }

    fn fetch_object(
        &self,
        name: &str,
        location: &ObjectLocation,
        staging: &Path,
        exclude: &ExcludeSet,
        token: &CancellationToken,
    ) -> Result<()> {
        let response = self.client.get(location.https_url()).send()?;
        if !response.status().is_success() {
            return Err(Error::Transfer {
                dialect: Dialect::ObjectStorage,
                kind: TransferKind::NotFound,
                name: name.to_string(),
                url: location.https_url(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let reader = CountingReader::new(response, token.clone());
        expand_tar_gz(reader, staging, exclude).map_err(|e| cancellation_or(name, e))?;
        Ok(())
    }
}

/// Write a downloaded payload into `staging`: expand archives, store anything
/// else as a single file, and verify the checksum when one is declared.
pub fn store_payload<R: Read>(
    request: &DownloadRequest,
    reader: R,
    staging: &Path,
    token: &CancellationToken,
    progress: Option<Arc<crate::progress::TransferProgress>>,
) -> Result<()> {
    // Nothing may be created once the caller has given up on the staging area.
    if token.is_cancelled() {
        return Err(Error::Interrupted {
            name: request.name.clone(),
        });
    }
    let expected = request
        .checksum
        .as_deref()
        .map(|c| expected_sha256(&request.name, c))
        .transpose()?;

    let mut reader = CountingReader::new(reader, token.clone()).with_progress(progress);
    if expected.is_some() {
        reader = reader.with_hashing();
    }

    fs::create_dir_all(staging)?;
    let file_name = request.file_name();
    if is_tar_gz(request.url.path()) {
        expand_tar_gz(&mut reader, staging, &request.exclude)
            .map_err(|e| cancellation_or(&request.name, e))?;
        // Drain trailing padding so the hash covers the whole payload.
        io::copy(&mut reader, &mut io::sink()).map_err(|e| io_cancellation_or(&request.name, e))?;
    } else {
        let mut file = File::create(staging.join(&file_name))?;
        io::copy(&mut reader, &mut file).map_err(|e| io_cancellation_or(&request.name, e))?;
    }

    if let (Some(expected), Some(actual)) = (expected, reader.finish_hash()) {
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(Error::ChecksumMismatch {
                name: request.name.clone(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Accepts `sha256:<hex>` or bare hex.
fn expected_sha256(name: &str, checksum: &str) -> Result<String> {
    let (algorithm, digest) = checksum.split_once(':').unwrap_or(("sha256", checksum));
    if !algorithm.eq_ignore_ascii_case("sha256") {
        return Err(Error::manifest(
            name,
            format!("unsupported checksum algorithm '{}'", algorithm),
        ));
    }
    if digest.len() != 64 || hex::decode(digest).is_err() {
        return Err(Error::manifest(
            name,
            format!("checksum '{}' is not a SHA-256 hex digest", checksum),
        ));
    }
    Ok(digest.to_ascii_lowercase())
}

fn plain_error(request: &DownloadRequest, kind: TransferKind, message: impl Into<String>) -> Error {
    Error::Transfer {
        dialect: Dialect::PlainTransport,
        kind,
        name: request.name.clone(),
        url: request.url.to_string(),
        message: message.into(),
    }
}

fn io_cancellation_or(name: &str, err: io::Error) -> Error {
    if is_cancellation(&err) {
        Error::Interrupted {
            name: name.to_string(),
        }
    } else {
        Error::Io(err)
    }
}

fn cancellation_or(name: &str, err: Error) -> Error {
    match err {
        Error::Io(io_err) => io_cancellation_or(name, io_err),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::tar_gz;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            name: "helmfile".to_string(),
            url: Url::parse(url).unwrap(),
            checksum: None,
            rename: false,
            exclude: ExcludeSet::default(),
        }
    }

    fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[test]
    fn test_file_name_from_url_or_rename() {
        let mut req = request("https://example.com/releases/helmfile_linux_amd64");
        assert_eq!(req.file_name(), "helmfile_linux_amd64");
        req.rename = true;
        assert_eq!(req.file_name(), "helmfile");
        assert_eq!(request("https://example.com/").file_name(), "helmfile");
    }

    #[test]
    fn test_store_single_file_with_checksum() {
        let temp = TempDir::new().unwrap();
        let mut req = request("https://example.com/bin/helmfile");
        req.checksum = Some(format!("sha256:{}", sha256_hex(b"binary")));

        store_payload(&req, &b"binary"[..], temp.path(), &CancellationToken::new(), None).unwrap();

        assert_eq!(fs::read(temp.path().join("helmfile")).unwrap(), b"binary");
    }

    #[test]
    fn test_store_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        let mut req = request("https://example.com/bin/helmfile");
        req.checksum = Some(sha256_hex(b"other"));

        let err = store_payload(&req, &b"binary"[..], temp.path(), &CancellationToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_store_rejects_unknown_checksum_algorithm() {
        let temp = TempDir::new().unwrap();
        let mut req = request("https://example.com/bin/helmfile");
        req.checksum = Some("md5:abc".to_string());
        let err = store_payload(&req, &b"x"[..], temp.path(), &CancellationToken::new(), None)
            .unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
    }

    #[test]
    fn test_store_expands_archive_and_hashes_whole_payload() {
        let temp = TempDir::new().unwrap();
        let data = tar_gz(&[("helmfile", "bin"), ("LICENSE", "mit")]);
        let mut req = request("https://example.com/helmfile_0.1.0.tar.gz");
        req.checksum = Some(sha256_hex(&data));
        req.exclude = ExcludeSet::new(&["LICENSE"]).unwrap();

        store_payload(&req, &data[..], temp.path(), &CancellationToken::new(), None).unwrap();

        assert!(temp.path().join("helmfile").exists());
        assert!(!temp.path().join("LICENSE").exists());
    }

    #[test]
    fn test_store_cancelled_reports_interrupted() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join(".staging-x/payload");
        let token = CancellationToken::new();
        token.cancel();
        let err = store_payload(
            &request("https://example.com/bin/helmfile"),
            &b"binary"[..],
            &staging,
            &token,
            None,
        )
        .unwrap_err();
        assert!(err.is_interrupted());
        assert!(!temp.path().join(".staging-x").exists());
    }

    #[test]
    fn test_cancelled_directory_download_copies_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("remote");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("project.yaml"), "").unwrap();
        let staging = temp.path().join("staging");
        let token = CancellationToken::new();
        token.cancel();

        let req = request(Url::from_file_path(&source).unwrap().as_str());
        let err = DefaultTransport::new()
            .download(&req, &staging, &token, None)
            .unwrap_err();

        assert!(err.is_interrupted());
        assert!(!staging.exists());
    }

    #[test]
    fn test_default_download_from_file_url() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("terraform");
        fs::write(&source, "tf").unwrap();
        let staging = temp.path().join("staging");

        let req = request(Url::from_file_path(&source).unwrap().as_str());
        DefaultTransport::new()
            .download(&req, &staging, &CancellationToken::new(), Some(&ProgressPool::hidden()))
            .unwrap();

        assert_eq!(fs::read_to_string(staging.join("terraform")).unwrap(), "tf");
    }

    #[test]
    fn test_default_download_copies_directory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("repo");
        fs::create_dir_all(source.join("charts")).unwrap();
        fs::write(source.join("charts/values.yaml"), "a: 1").unwrap();
        let staging = temp.path().join("staging");

        let req = request(Url::from_directory_path(&source).unwrap().as_str());
        DefaultTransport::new()
            .download(&req, &staging, &CancellationToken::new(), None)
            .unwrap();

        assert!(staging.join("charts/values.yaml").exists());
    }

    #[test]
    fn test_default_download_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let req = request(Url::from_file_path(temp.path().join("nope")).unwrap().as_str());
        let err = DefaultTransport::new()
            .download(&req, &temp.path().join("staging"), &CancellationToken::new(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer {
                dialect: Dialect::PlainTransport,
                kind: TransferKind::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn test_default_download_unsupported_scheme() {
        let temp = TempDir::new().unwrap();
        let req = request("ftp://example.com/file");
        let err = DefaultTransport::new()
            .download(&req, temp.path(), &CancellationToken::new(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer {
                kind: TransferKind::MalformedUrl,
                ..
            }
        ));
    }
}
