//! Structured cancellation for in-flight transfers.
//!
//! A [`CancellationToken`] is cloned into every transfer. Workers poll
//! [`CancellationToken::is_cancelled`] between reads; waiters call
//! [`CancellationToken::subscribe`] to get a channel that becomes ready the
//! moment the token is cancelled, so it can sit in a `select!` beside the
//! worker's own channels. Dropping the [`Subscription`] unregisters it.
//!
//! The engine never installs signal handlers. A binary wires an OS interrupt to
//! [`CancellationToken::cancel`] from a watchdog of its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{bounded, Receiver, Sender};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    // Dropping these disconnects every subscriber.
    waiters: Mutex<HashMap<u64, Sender<()>>>,
}

impl Inner {
    fn waiters(&self) -> MutexGuard<'_, HashMap<u64, Sender<()>>> {
        match self.waiters.lock() {
            Ok(waiters) => waiters,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A cloneable, thread-safe cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token and wake every subscriber. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let waiters = std::mem::take(&mut *self.inner.waiters());
        drop(waiters);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A subscription whose receiver disconnects once the token is cancelled.
    ///
    /// Nothing is ever sent on it; readiness means cancellation.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(0);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut waiters = self.inner.waiters();
        // Checked under the lock so a concurrent cancel cannot be missed.
        if !self.is_cancelled() {
            waiters.insert(id, tx);
        }
        Subscription {
            inner: Arc::clone(&self.inner),
            id,
            receiver: rx,
        }
    }
}

/// A registered waiter on a [`CancellationToken`].
#[derive(Debug)]
pub struct Subscription {
    inner: Arc<Inner>,
    id: u64,
    receiver: Receiver<()>,
}

impl Subscription {
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.waiters().remove(&self.id);
    }
}
