//! Interval-bounded recompute cache.
//!
//! A [`RecomputeCache`] holds one published [`CacheEntry`] and recomputes it
//! at most once per interval, however many tasks ask for it:
//!
//! ```text
//! get() ──▶ entry fresh? ──yes──▶ return entry
//!               │ no
//!               ▼
//!         entry exists? ──yes──▶ try_lock ──busy──▶ return previous entry
//!               │ no                 │ won
//!               ▼                    ▼
//!         lock (wait) ──▶ re-check ──▶ spawn compute ──▶ publish ──▶ return
//! ```
//!
//! The compute runs on its own task, so dropping the caller that triggered it
//! does not cancel it. A failed compute leaves the previous entry in place.
//! Its error goes to the triggering caller and to every caller that was
//! already waiting on it; none of them start a compute of their own.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};

/// One published result of a compute.
///
/// Entries are immutable; a recompute replaces the whole `Arc`.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub computed_at: DateTime<Utc>,
    pub next_recompute_at: DateTime<Utc>,
    /// Wall time the compute took.
    pub took: Duration,
}

impl<T> CacheEntry<T> {
    /// Whether the entry may still be served without recomputing.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.next_recompute_at
    }

    /// Seconds since the entry was computed.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.computed_at).num_seconds()
    }
}

struct Shared<T> {
    interval: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<Arc<CacheEntry<T>>>>,
    recompute: Arc<Mutex<()>>,
    /// Finished compute attempts, bumped while the recompute lock is held.
    attempts: AtomicU64,
    /// Error of the latest attempt, cleared when one succeeds.
    last_failure: RwLock<Option<Arc<Error>>>,
}

impl<T> Shared<T> {
    fn next_after(&self, computed_at: DateTime<Utc>) -> DateTime<Utc> {
        let interval = TimeDelta::from_std(self.interval).unwrap_or(TimeDelta::MAX);
        computed_at
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Shared cache that recomputes its value at most once per interval.
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use fleetwatch::{Error, RecomputeCache, SystemClock};
///
/// # tokio_test::block_on(async {
/// let cache = RecomputeCache::new(Duration::from_secs(5), Arc::new(SystemClock));
///
/// let first = cache.get(|| async { Ok::<_, Error>(42u32) }).await.unwrap();
/// let second = cache.get(|| async { Ok::<_, Error>(0u32) }).await.unwrap();
///
/// assert_eq!(second.payload, 42);
/// assert_eq!(first.computed_at, second.computed_at);
/// # });
/// ```
pub struct RecomputeCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RecomputeCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for RecomputeCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecomputeCache")
            .field("interval", &self.shared.interval)
            .field("computed_at", &self.peek().map(|e| e.computed_at))
            .finish()
    }
}

impl<T> RecomputeCache<T> {
    /// Create an empty cache.
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                interval,
                clock,
                entry: RwLock::new(None),
                recompute: Arc::new(Mutex::new(())),
                attempts: AtomicU64::new(0),
                last_failure: RwLock::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// The published entry, if any, without triggering a compute.
    pub fn peek(&self) -> Option<Arc<CacheEntry<T>>> {
        self.shared.entry.read().clone()
    }

    /// Drop the published entry. The next `get` computes and waits.
    pub fn invalidate(&self) {
        if self.shared.entry.write().take().is_some() {
            debug!("Cache entry invalidated");
        }
    }

    fn fresh_entry(&self) -> Option<Arc<CacheEntry<T>>> {
        let now = self.shared.clock.now();
        self.peek().filter(|entry| entry.is_fresh(now))
    }
}

impl<T: Send + Sync + 'static> RecomputeCache<T> {
    /// Return the current entry, recomputing it with `compute` if it is due.
    ///
    /// `compute` is only called by the one caller that wins the recompute.
    /// While a recompute is in flight, other callers get the previous entry;
    /// if there is none yet they wait for the first compute to finish and
    /// share its outcome, error included.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get<F, Fut>(&self, compute: F) -> Result<Arc<CacheEntry<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(entry) = self.peek() {
            if entry.is_fresh(self.shared.clock.now()) {
                debug!("Cache hit, next recompute at {}", entry.next_recompute_at);
                return Ok(entry);
            }

            let guard = match Arc::clone(&self.shared.recompute).try_lock_owned() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Recompute in flight, serving entry from {}", entry.computed_at);
                    return Ok(entry);
                }
            };

            // Published between the peek and the lock.
            if let Some(entry) = self.fresh_entry() {
                return Ok(entry);
            }
            return self.recompute(guard, compute()).await;
        }

        let seen = self.shared.attempts.load(Ordering::Acquire);
        let guard = Arc::clone(&self.shared.recompute).lock_owned().await;
        if let Some(entry) = self.peek() {
            return Ok(entry);
        }
        if self.shared.attempts.load(Ordering::Acquire) != seen {
            if let Some(failure) = self.shared.last_failure.read().clone() {
                debug!("Waited on a failed compute, not retrying");
                return Err(Error::Shared(failure));
            }
        }
        debug!("Cache empty, computing first entry");
        self.recompute(guard, compute()).await
    }

    async fn recompute<Fut>(
        &self,
        guard: OwnedMutexGuard<()>,
        compute: Fut,
    ) -> Result<Arc<CacheEntry<T>>>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);

        let task = tokio::spawn(async move {
            let started = tokio::time::Instant::now();

            // The inner task isolates a panicking compute, so the outcome is
            // always recorded before the lock is released.
            let outcome = match tokio::spawn(compute).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Recompute task aborted: {}", e);
                    Err(Error::ComputeAborted(e.to_string()))
                }
            };

            let result = match outcome {
                Ok(payload) => {
                    let computed_at = shared.clock.now();
                    let entry = Arc::new(CacheEntry {
                        payload,
                        computed_at,
                        next_recompute_at: shared.next_after(computed_at),
                        took: started.elapsed(),
                    });
                    *shared.entry.write() = Some(Arc::clone(&entry));
                    *shared.last_failure.write() = None;

                    info!(
                        "Recomputed in {:?}, next recompute at {}",
                        entry.took, entry.next_recompute_at
                    );
                    Ok(entry)
                }
                Err(e) => {
                    warn!("Recompute failed, keeping previous entry: {}", e);
                    let failure = Arc::new(e);
                    *shared.last_failure.write() = Some(Arc::clone(&failure));
                    Err(Error::Shared(failure))
                }
            };

            shared.attempts.fetch_add(1, Ordering::Release);
            drop(guard);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Recompute task aborted: {}", e);
                Err(Error::ComputeAborted(e.to_string()))
            }
        }
    }
}

/// Hands out one shared cache per `(key, interval)` pair.
pub struct CacheRegistry<T> {
    clock: Arc<dyn Clock>,
    caches: RwLock<HashMap<(String, Duration), RecomputeCache<T>>>,
}

impl<T> fmt::Debug for CacheRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.caches.read().len())
            .finish()
    }
}

impl<T> CacheRegistry<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cache for `key` at `interval`, creating it if needed.
    pub fn cache_for(&self, key: &str, interval: Duration) -> RecomputeCache<T> {
        // Fast path
        {
            let caches = self.caches.read();
            if let Some(cache) = caches.get(&(key.to_string(), interval)) {
                return cache.clone();
            }
        }

        // Slow path
        let mut caches = self.caches.write();
        caches
            .entry((key.to_string(), interval))
            .or_insert_with(|| RecomputeCache::new(interval, Arc::clone(&self.clock)))
            .clone()
    }

    /// Tear down a cache. Handles already given out keep working.
    pub fn remove(&self, key: &str, interval: Duration) -> bool {
        self.caches
            .write()
            .remove(&(key.to_string(), interval))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
