//! Awaiter registry: id -> in-flight handle, with deferred eviction.
//!
//! Lets a second flow of control resume an operation submitted by the
//! first (e.g. submit in one request, wait in the next) without
//! re-submitting work.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::OperationId;
use crate::poller::Awaiter;

/// How long a finished awaiter stays resolvable.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

struct Entry {
    awaiter: Awaiter,
    /// Bumped on every (re)schedule; a timer only evicts its own generation.
    generation: u64,
    eviction: Option<JoinHandle<()>>,
}

struct RegistryInner {
    entries: DashMap<OperationId, Entry>,
    grace_period: Duration,
    generations: AtomicU64,
}

impl RegistryInner {
    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Registry of in-flight awaiters, keyed by operation id.
///
/// Design:
/// - Explicit store object, injected into whoever composes the poller.
/// - Cheap to clone; clones share the same map.
/// - Backed by a concurrent map, safe under the multi-threaded runtime.
#[derive(Clone)]
pub struct AwaiterRegistry {
    inner: Arc<RegistryInner>,
}

impl AwaiterRegistry {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                grace_period,
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.inner.grace_period
    }

    /// Register an awaiter under its operation id.
    ///
    /// An existing entry for the same id is silently replaced and its pending
    /// eviction is dropped. Single-flight per id is up to the caller.
    pub fn register(&self, awaiter: Awaiter) {
        let id = awaiter.id().clone();
        let entry = Entry {
            awaiter,
            generation: self.inner.next_generation(),
            eviction: None,
        };
        if let Some(previous) = self.inner.entries.insert(id.clone(), entry) {
            if let Some(timer) = previous.eviction {
                timer.abort();
            }
            debug!(operation_id = %id, "replaced registered awaiter");
        }
    }

    pub fn lookup(&self, id: &OperationId) -> Option<Awaiter> {
        self.inner
            .entries
            .get(id)
            .map(|entry| entry.awaiter.clone())
    }

    /// Start, or restart, the grace-period timer for `id`.
    ///
    /// The entry stays resolvable for at least one full grace period after
    /// the latest call. Unknown ids are ignored.
    pub fn schedule_eviction(&self, id: &OperationId) {
        let Some(mut entry) = self.inner.entries.get_mut(id) else {
            return;
        };

        let generation = self.inner.next_generation();
        entry.generation = generation;
        if let Some(previous) = entry.eviction.take() {
            previous.abort();
        }

        let registry = Arc::downgrade(&self.inner);
        let grace_period = self.inner.grace_period;
        let key = id.clone();
        entry.eviction = Some(tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            if let Some(inner) = registry.upgrade()
                && inner
                    .entries
                    .remove_if(&key, |_, entry| entry.generation == generation)
                    .is_some()
            {
                debug!(operation_id = %key, "evicted awaiter after grace period");
            }
        }));
    }

    /// Remove `id` immediately, cancelling any pending eviction.
    pub fn evict(&self, id: &OperationId) -> Option<Awaiter> {
        let (_, entry) = self.inner.entries.remove(id)?;
        if let Some(timer) = entry.eviction {
            timer.abort();
        }
        Some(entry.awaiter)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Weak handle for awaiters, so registry -> awaiter -> registry is not a cycle.
    pub(crate) fn handle(&self) -> RegistryHandle {
        RegistryHandle(Arc::downgrade(&self.inner))
    }
}

impl Default for AwaiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AwaiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaiterRegistry")
            .field("entries", &self.len())
            .field("grace_period", &self.inner.grace_period)
            .finish()
    }
}

/// Non-owning reference from an awaiter back to its registry.
#[derive(Clone, Default)]
pub(crate) struct RegistryHandle(Weak<RegistryInner>);

impl RegistryHandle {
    pub(crate) fn schedule_eviction(&self, id: &OperationId) {
        if let Some(inner) = self.0.upgrade() {
            AwaiterRegistry { inner }.schedule_eviction(id);
        }
    }
}
