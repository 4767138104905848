//! Merge cache
//!
//! TTL-bounded materialized view of the registry.
//!
//! - `read()` returns the current snapshot while it is younger than the TTL
//!   and no invalidation has happened since it was built
//! - Rebuilds are single-flight: concurrent misses wait for one registry scan
//! - Stale-if-error: a failed rebuild serves the last good snapshot; with no
//!   prior snapshot the store error is returned
//! - Readers that queued behind a finished rebuild attempt take its outcome,
//!   failed or not, instead of scanning again
//!
//! Invalidation bumps a generation counter. A snapshot only counts as fresh
//! if it was built at the current generation, so an invalidation that lands
//! mid-rebuild still forces the next read to rebuild.

mod clock;
mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use snapshot::MergeSnapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::error::MergeError;
use crate::registry::{MergeRegistry, StoreError};

/// Default snapshot time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Counters describing cache behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful registry scans.
    pub rebuilds: u64,
    /// Failed scans answered with the previous snapshot.
    pub stale_served: u64,
    /// Current invalidation generation.
    pub generation: u64,
    /// Age of the held snapshot, if any.
    pub snapshot_age: Option<Duration>,
}

/// Shared, read-mostly cache in front of a [`MergeRegistry`].
pub struct MergeCache {
    registry: MergeRegistry,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<MergeSnapshot>>>,
    generation: AtomicU64,
    rebuild_lock: Mutex<()>,
    /// Completed rebuild attempts, successful or not.
    attempts: AtomicU64,
    /// Error of the latest attempt, if it failed. Guarded by `rebuild_lock`.
    last_failure: Mutex<Option<String>>,
    rebuilds: AtomicU64,
    stale_served: AtomicU64,
}

impl MergeCache {
    pub fn new(registry: MergeRegistry, ttl: Duration) -> Self {
        Self::with_clock(registry, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: MergeRegistry, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            ttl,
            clock,
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
            rebuild_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            rebuilds: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current snapshot, rebuilding first if it is missing or stale.
    pub fn read(&self) -> Result<Arc<MergeSnapshot>, MergeError> {
        let seen_attempts = self.attempts.load(Ordering::SeqCst);
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }

        let _guard = self.rebuild_lock.lock().unwrap_or_else(|e| e.into_inner());

        // Another caller may have finished a rebuild while we waited.
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }
        if self.attempts.load(Ordering::SeqCst) != seen_attempts {
            if let Some(outcome) = self.failed_attempt_outcome() {
                return outcome;
            }
        }

        self.rebuild()
    }

    /// Outcome of the latest attempt when it failed. Caller holds `rebuild_lock`.
    fn failed_attempt_outcome(&self) -> Option<Result<Arc<MergeSnapshot>, MergeError>> {
        let failure = self
            .last_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;

        Some(match self.held_snapshot() {
            Some(previous) => {
                self.stale_served.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("joining failed rebuild, serving stale snapshot");
                Ok(previous)
            }
            None => Err(MergeError::StoreUnavailable(StoreError::Unavailable(
                failure,
            ))),
        })
    }

    fn record_attempt(&self, failure: Option<String>) {
        *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) = failure;
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Force the next `read()` to rebuild regardless of TTL.
    ///
    /// The old snapshot is kept only as the stale-if-error fallback.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "merge cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        CacheStats {
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            generation: self.generation.load(Ordering::SeqCst),
            snapshot_age: self
                .held_snapshot()
                .map(|s| now.saturating_duration_since(s.built_at())),
        }
    }

    fn held_snapshot(&self) -> Option<Arc<MergeSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn fresh_snapshot(&self) -> Option<Arc<MergeSnapshot>> {
        let snapshot = self.held_snapshot()?;
        let generation = self.generation.load(Ordering::SeqCst);
        let age = self
            .clock
            .now()
            .saturating_duration_since(snapshot.built_at());

        if snapshot.generation() == generation && age < self.ttl {
            Some(snapshot)
        } else {
            None
        }
    }

    /// Scan the registry and swap in a new snapshot. Caller holds `rebuild_lock`.
    fn rebuild(&self) -> Result<Arc<MergeSnapshot>, MergeError> {
        let generation = self.generation.load(Ordering::SeqCst);

        match self.registry.list() {
            Ok(directives) => {
                let snapshot = Arc::new(MergeSnapshot::build(
                    &directives,
                    self.clock.now(),
                    generation,
                ));
                *self.current.write().unwrap_or_else(|e| e.into_inner()) =
                    Some(Arc::clone(&snapshot));
                self.rebuilds.fetch_add(1, Ordering::Relaxed);
                self.record_attempt(None);

                tracing::info!(
                    hidden = snapshot.hidden_handles().len(),
                    primaries = snapshot.merge_map().len(),
                    generation,
                    "merge snapshot rebuilt"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.record_attempt(Some(e.to_string()));
                match self.held_snapshot() {
                    Some(previous) => {
                        self.stale_served.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "merge snapshot rebuild failed, serving stale snapshot");
                        Ok(previous)
                    }
                    None => {
                        tracing::error!(error = %e, "merge snapshot rebuild failed with no prior snapshot");
                        Err(MergeError::StoreUnavailable(e))
                    }
                }
            }
        }
    }
}
