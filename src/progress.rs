//! Progress indicators for concurrent transfers.
//!
//! A [`ProgressPool`] owns at most one `indicatif::MultiProgress`. Each
//! transfer takes a [`TransferProgress`] from the pool; the pool creates the
//! `MultiProgress` on the first acquisition and tears it down when the last
//! indicator is dropped. The count and the `MultiProgress` sit behind one
//! mutex.
//!
//! [`CountingReader`] is the byte-stream proxy that feeds an indicator. It also
//! checks the transfer's cancellation token on every read and can hash the
//! bytes it passes through for checksum verification.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sha2::{Digest, Sha256};

use crate::cancel::CancellationToken;

#[derive(Default)]
struct PoolState {
    multi: Option<MultiProgress>,
    active: usize,
}

/// Shared pool of progress indicators.
#[derive(Clone, Default)]
pub struct ProgressPool {
    state: Arc<Mutex<PoolState>>,
    hidden: bool,
}

impl ProgressPool {
    /// A pool drawing to stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool whose indicators are never drawn. Counting still happens.
    pub fn hidden() -> Self {
        Self {
            state: Arc::default(),
            hidden: true,
        }
    }

    /// Number of live indicators.
    pub fn active(&self) -> usize {
        self.lock().active
    }

    /// True while a `MultiProgress` exists.
    pub fn is_live(&self) -> bool {
        self.lock().multi.is_some()
    }

    /// Create an indicator for one transfer. `total` is the byte count if known.
    pub fn acquire(&self, label: &str, total: Option<u64>) -> TransferProgress {
        let mut state = self.lock();
        let multi = state.multi.get_or_insert_with(|| {
            if self.hidden {
                MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
            } else {
                MultiProgress::new()
            }
        });

        let bar = match total {
            Some(len) => ProgressBar::new(len).with_style(bytes_style()),
            None => ProgressBar::new_spinner().with_style(spinner_style()),
        };
        let bar = multi.add(bar);
        bar.set_message(label.to_string());
        state.active += 1;

        TransferProgress {
            bar,
            pool: self.clone(),
        }
    }

    fn release(&self, bar: &ProgressBar) {
        let mut state = self.lock();
        if let Some(multi) = state.multi.as_ref() {
            multi.remove(bar);
        }
        state.active = state.active.saturating_sub(1);
        if state.active == 0 {
            if let Some(multi) = state.multi.take() {
                let _ = multi.clear();
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // The state is a counter and a handle; both stay valid after a panic.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:30!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg:30!} {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One transfer's indicator. Returns itself to the pool on drop.
pub struct TransferProgress {
    bar: ProgressBar,
    pool: ProgressPool,
}

impl TransferProgress {
    pub fn inc(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    pub fn set_length(&self, total: u64) {
        self.bar.set_length(total);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        self.pool.release(&self.bar);
    }
}

/// Error payload a [`CountingReader`] fails with once its token is cancelled.
///
/// Not `ErrorKind::Interrupted`: `std::io` helpers retry that kind.
#[derive(Debug)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("transfer cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// True if `err` was produced by a cancelled [`CountingReader`].
pub fn is_cancellation(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<Cancelled>())
}

/// Read proxy: counts bytes into an indicator, honours cancellation, and
/// optionally hashes the stream.
pub struct CountingReader<R> {
    inner: R,
    token: CancellationToken,
    progress: Option<Arc<TransferProgress>>,
    hasher: Option<Sha256>,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self {
            inner,
            token,
            progress: None,
            hasher: None,
            count: 0,
        }
    }

    pub fn with_progress(mut self, progress: Option<Arc<TransferProgress>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_hashing(mut self) -> Self {
        self.hasher = Some(Sha256::new());
        self
    }

    /// Bytes read so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Hex SHA-256 of everything read, if hashing was enabled.
    pub fn finish_hash(self) -> Option<String> {
        self.hasher.map(|h| hex::encode(h.finalize()))
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, Cancelled));
        }
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        if let Some(progress) = self.progress.as_ref() {
            progress.inc(n as u64);
        }
        Ok(n)
    }
}
