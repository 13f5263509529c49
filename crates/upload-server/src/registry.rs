//! Bookkeeping for concurrently running sessions.
//!
//! The registry counts; it never coordinates. Sessions share nothing
//! through it except the counters and, when a limit is configured, the
//! admission semaphore.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::session::SessionState;

/// Point-in-time view of the registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub active: usize,
    pub started: u64,
    pub committed: u64,
    pub aborted: u64,
}

/// Counts sessions and optionally bounds how many run at once.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: AtomicUsize,
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    limit: Option<Arc<Semaphore>>,
}

impl SessionRegistry {
    /// Creates a registry. `max_concurrent` of `None` means unbounded.
    pub fn new(max_concurrent: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            limit: max_concurrent.map(|n| Arc::new(Semaphore::new(n))),
            ..Self::default()
        })
    }

    /// Registers a new session, waiting for a free slot if the registry is
    /// bounded.
    pub async fn admit(self: &Arc<Self>) -> SessionGuard {
        let permit = match &self.limit {
            // The semaphore is never closed, so acquisition only fails if
            // that invariant is broken; run unbounded in that case.
            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        };
        self.active.fetch_add(1, Ordering::Relaxed);
        self.started.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            registry: Arc::clone(self),
            _permit: permit,
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            active: self.active.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }

    /// Number of sessions currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// Registration of one running session. Dropping it frees the slot.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl SessionGuard {
    /// Records the session's final state and releases the slot.
    pub fn finish(self, state: SessionState) {
        match state {
            SessionState::Committed => {
                self.registry.committed.fetch_add(1, Ordering::Relaxed);
            }
            SessionState::Aborted => {
                self.registry.aborted.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.active.fetch_sub(1, Ordering::Relaxed);
    }
}
