//! # Artifact Transfer
//!
//! [`ArtifactTransfer`] materializes one [`VersionedPackage`] as
//! `<root>/<name>-<escaped version>/`. The source dialect is decided once, when
//! the transfer is planned, as a closed [`Source`] enum:
//!
//! - [`Source::VersionControl`]: `git::` URLs, checked out at a pinned ref.
//! - [`Source::PlainTransport`]: HTTP(S) and `file://` downloads.
//! - [`Source::ObjectStorage`]: the package's `artifact_url`, tried first in
//!   artifact mode. A missing object yields "not present" and the plan falls
//!   through to the package's primary source.
//!
//! ## Idempotence
//!
//! An existing destination directory is never fetched again. Every dialect
//! writes into a staging directory beside the destination and renames it into
//! place on success, so a failed or interrupted transfer never leaves a
//! destination that a later run would mistake for a finished one.
//!
//! ## Concurrency
//!
//! Plain-transport downloads run on a worker thread. The caller waits on three
//! channels at once: completion, an error from the worker, and the
//! cancellation token. Cancellation wins with [`Error::Interrupted`]; the
//! worker notices the token on its next read and stops.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, select};
use log::{debug, info, warn};
use url::Url;

use crate::cancel::CancellationToken;
use crate::defaults::INVENTORY_DIR;
use crate::error::{Dialect, Error, Result, TransferKind};
use crate::git::{is_vcs_url, CheckoutRequest};
use crate::object_storage::ObjectLocation;
use crate::package::VersionedPackage;
use crate::path::ExcludeSet;
use crate::progress::ProgressPool;
use crate::transport::{DownloadRequest, Transport};

/// Knobs shared by every transfer of a run.
#[derive(Clone, Default)]
pub struct TransferOptions {
    /// Opaque token embedded in version-control URLs.
    pub token: Option<String>,
    /// Try `artifact_url` in object storage before the primary source.
    pub artifact_mode: bool,
    /// Archive entries to skip during expansion.
    pub exclude: ExcludeSet,
    /// Indicator pool; `None` disables progress reporting.
    pub progress: Option<ProgressPool>,
    pub cancel: CancellationToken,
    /// Where `inventory/` subtrees found in object-storage archives are merged.
    pub inventory_dir: Option<PathBuf>,
}

/// Where a package's bytes come from.
#[derive(Debug, Clone)]
pub enum Source {
    VersionControl(CheckoutRequest),
    PlainTransport(DownloadRequest),
    ObjectStorage(ObjectLocation),
}

impl Source {
    /// The package's own source, from its `url`.
    pub fn primary(pkg: &VersionedPackage, options: &TransferOptions) -> Result<Self> {
        if is_vcs_url(&pkg.url) {
            let request = CheckoutRequest::from_url(&pkg.name, &pkg.url, options.token.as_deref())?;
            return Ok(Source::VersionControl(request));
        }
        let url = Url::parse(&pkg.url).map_err(|e| Error::Transfer {
            dialect: Dialect::PlainTransport,
            kind: TransferKind::MalformedUrl,
            name: pkg.name.clone(),
            url: pkg.url.clone(),
            message: e.to_string(),
        })?;
        Ok(Source::PlainTransport(DownloadRequest {
            name: pkg.name.clone(),
            url,
            checksum: pkg.checksum.clone(),
            rename: pkg.rename,
            exclude: options.exclude.clone(),
        }))
    }

    /// Sources to try, in order.
    pub fn plan(pkg: &VersionedPackage, options: &TransferOptions) -> Result<Vec<Self>> {
        let mut plan = Vec::with_capacity(2);
        if options.artifact_mode {
            if let Some(artifact_url) = &pkg.artifact_url {
                plan.push(Source::ObjectStorage(ObjectLocation::parse(artifact_url)?));
            }
        }
        plan.push(Self::primary(pkg, options)?);
        Ok(plan)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Source::VersionControl(_) => Dialect::VersionControl,
            Source::PlainTransport(_) => Dialect::PlainTransport,
            Source::ObjectStorage(_) => Dialect::ObjectStorage,
        }
    }
}

/// Result of fetching from one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Done,
    NotPresent,
}

/// Result of a whole transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination already existed; nothing was fetched.
    AlreadyPresent,
    /// Fetched with the given dialect.
    Fetched(Dialect),
}

/// Materializes packages through a [`Transport`].
#[derive(Clone)]
pub struct ArtifactTransfer {
    transport: Arc<dyn Transport>,
    options: TransferOptions,
}

impl ArtifactTransfer {
    pub fn new(transport: Arc<dyn Transport>, options: TransferOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Materialize `pkg` under `root`, recording `resolved_path` and
    /// `local_artifacts` on success.
    ///
    /// Sources are validated even when the destination already exists, so a
    /// URL that became invalid fails on every run.
    pub fn transfer(&self, pkg: &mut VersionedPackage, root: &Path) -> Result<TransferOutcome> {
        let plan = Source::plan(pkg, &self.options)?;
        let dest = pkg.destination(root);
        if dest.exists() {
            debug!("{} already present at {}", pkg, dest.display());
            record(pkg, &dest)?;
            return Ok(TransferOutcome::AlreadyPresent);
        }
        if self.options.cancel.is_cancelled() {
            return Err(Error::Interrupted {
                name: pkg.name.clone(),
            });
        }

        fs::create_dir_all(root)?;

        for source in &plan {
            let staging = tempfile::Builder::new()
                .prefix(".staging-")
                .tempdir_in(root)?;
            let target = staging.path().join("payload");

            match self.fetch(pkg, source, &target)? {
                Fetched::NotPresent => {
                    warn!(
                        "{} not present in object storage, falling back to {}",
                        pkg, pkg.url
                    );
                    continue;
                }
                Fetched::Done => {
                    if !target.exists() {
                        fs::create_dir_all(&target)?;
                    }
                    fs::rename(&target, &dest)?;
                    record(pkg, &dest)?;
                    info!("Fetched {} ({})", pkg, source.dialect());
                    return Ok(TransferOutcome::Fetched(source.dialect()));
                }
            }
        }

        Err(Error::Transfer {
            dialect: Dialect::ObjectStorage,
            kind: TransferKind::NotFound,
            name: pkg.name.clone(),
            url: pkg.artifact_url.clone().unwrap_or_else(|| pkg.url.clone()),
            message: "no source produced the package".to_string(),
        })
    }

    fn fetch(&self, pkg: &VersionedPackage, source: &Source, target: &Path) -> Result<Fetched> {
        self.fetch_from(pkg, source, target).map_err(|err| {
            // A child process killed by the same interrupt fails on its own terms.
            if self.options.cancel.is_cancelled() && !err.is_interrupted() {
                debug!("{} failed after cancellation: {}", pkg, err);
                Error::Interrupted {
                    name: pkg.name.clone(),
                }
            } else {
                err
            }
        })
    }

    fn fetch_from(&self, pkg: &VersionedPackage, source: &Source, target: &Path) -> Result<Fetched> {
        match source {
            Source::VersionControl(request) => {
                self.transport.checkout(&pkg.name, request, target)?;
                Ok(Fetched::Done)
            }
            Source::PlainTransport(request) => {
                self.download_concurrently(request, target)?;
                Ok(Fetched::Done)
            }
            Source::ObjectStorage(location) => self.fetch_object(pkg, location, target),
        }
    }

    fn fetch_object(
        &self,
        pkg: &VersionedPackage,
        location: &ObjectLocation,
        target: &Path,
    ) -> Result<Fetched> {
        if !self.transport.object_exists(location)? {
            return Ok(Fetched::NotPresent);
        }
        if crate::version::parse(&pkg.version).as_ref() != Some(&location.version) {
            warn!(
                "{} artifact declares version {} in {}",
                pkg, location.version, location
            );
        }
        self.transport.fetch_object(
            &pkg.name,
            location,
            target,
            &self.options.exclude,
            &self.options.cancel,
        )?;

        let inventory = target.join(INVENTORY_DIR);
        if let (true, Some(inventory_dir)) = (inventory.is_dir(), &self.options.inventory_dir) {
            let merged = crate::filesystem::copy_tree(&inventory, inventory_dir)?;
            debug!(
                "Merged {} inventory files from {} into {}",
                merged,
                location,
                inventory_dir.display()
            );
        }
        Ok(Fetched::Done)
    }

    /// Run the download on a worker and wait for completion, error, or
    /// cancellation, whichever comes first.
    ///
    /// On cancellation the worker is joined before returning, so nothing it
    /// writes can outlive the caller's staging directory.
    fn download_concurrently(&self, request: &DownloadRequest, target: &Path) -> Result<()> {
        let (done_tx, done_rx) = bounded::<()>(1);
        let (err_tx, err_rx) = bounded::<Error>(1);
        let cancelled = self.options.cancel.subscribe();

        let transport = Arc::clone(&self.transport);
        let worker_request = request.clone();
        let worker_target = target.to_path_buf();
        let token = self.options.cancel.clone();
        let pool = self.options.progress.clone();

        let worker = thread::Builder::new()
            .name(format!("transfer-{}", request.name))
            .spawn(move || {
                match transport.download(&worker_request, &worker_target, &token, pool.as_ref()) {
                    Ok(()) => {
                        let _ = done_tx.send(());
                    }
                    Err(err) => {
                        let _ = err_tx.send(err);
                    }
                }
            })?;

        // A disconnected channel means the worker is gone; whatever it managed
        // to report is on the other channel.
        select! {
            recv(done_rx) -> msg => match msg {
                Ok(()) => Ok(()),
                Err(_) => Err(err_rx
                    .try_recv()
                    .unwrap_or_else(|_| worker_lost(request))),
            },
            recv(err_rx) -> msg => match msg {
                Ok(err) => Err(err),
                Err(_) => done_rx.try_recv().map_err(|_| worker_lost(request)),
            },
            recv(cancelled.receiver()) -> _ => {
                if worker.join().is_err() {
                    warn!("Transfer worker for {} panicked", request.name);
                }
                Err(Error::Interrupted {
                    name: request.name.clone(),
                })
            }
        }
    }
}

fn record(pkg: &mut VersionedPackage, dest: &Path) -> Result<()> {
    pkg.local_artifacts = crate::filesystem::list_artifacts(dest)?;
    pkg.resolved_path = Some(dest.to_path_buf());
    Ok(())
}

fn worker_lost(request: &DownloadRequest) -> Error {
    Error::Transfer {
        dialect: Dialect::PlainTransport,
        kind: TransferKind::NotFound,
        name: request.name.clone(),
        url: request.url.to_string(),
        message: "transfer worker exited without reporting".to_string(),
    }
}
