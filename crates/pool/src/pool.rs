//! The pool itself: bounded ownership, lazy construction, lease brokering.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ExhaustionPolicy, PoolConfig, PoolStrategy};
use crate::error::{BoxError, Error, InvalidReleaseKind, Result};
use crate::lease::Lease;
use crate::pooled::Pooled;

type Factory<R> =
    Box<dyn Fn() -> BoxFuture<'static, std::result::Result<R, BoxError>> + Send + Sync>;

/// An idle entry wrapping a pooled value.
struct Entry<R> {
    value: R,
    created_at: Instant,
    last_used: Instant,
}

impl<R> Entry<R> {
    fn new(value: R) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_used: now,
        }
    }

    /// Re-admit a value, preserving its original `created_at`.
    fn returned(value: R, created_at: Instant) -> Self {
        Self {
            value,
            created_at,
            last_used: Instant::now(),
        }
    }

    fn is_expired(&self, config: &PoolConfig) -> bool {
        self.created_at.elapsed() > config.max_lifetime
            || self.last_used.elapsed() > config.idle_timeout
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    /// Idle values ready to lend.
    pub available: usize,
    /// Values currently lent out.
    pub in_use: usize,
    /// Total successful acquisitions.
    pub total_acquisitions: u64,
    /// Total check-ins, explicit releases and lease drops alike.
    pub total_releases: u64,
    /// Values ever constructed by the factory.
    pub created: u64,
    /// Values discarded: invalid, expired, surplus, or detached.
    pub destroyed: u64,
}

impl PoolStats {
    /// Values currently owned or lent out by the pool.
    #[must_use]
    pub fn total(&self) -> usize {
        self.available + self.in_use
    }
}

struct PoolState<R> {
    idle: VecDeque<Entry<R>>,
    /// Ids of outstanding leases. Membership here is exclusive ownership:
    /// a value is either inside `idle` or lent under exactly one id.
    in_use: HashSet<Uuid>,
    /// Leases lent beyond `max_size` under [`ExhaustionPolicy::Grow`].
    over_capacity: usize,
    closed: bool,
    total_acquisitions: u64,
    total_releases: u64,
    created: u64,
    destroyed: u64,
}

/// Inner shared state for the pool.
pub(crate) struct PoolInner<R: Pooled> {
    factory: Factory<R>,
    config: PoolConfig,
    state: Mutex<PoolState<R>>,
    /// Permits bound live values (idle + lent); blocked acquires wait here.
    semaphore: Semaphore,
}

/// Bounded object pool.
///
/// Manages up to [`max_size`](PoolConfig::max_size) values implementing
/// [`Pooled`], constructing them lazily through the factory supplied at
/// construction and lending each to exactly one caller at a time.
///
/// `Pool` is a cheap handle: clones share the same underlying pool.
pub struct Pool<R: Pooled> {
    inner: Arc<PoolInner<R>>,
}

impl<R: Pooled> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Pooled> std::fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<R: Pooled> Pool<R> {
    /// Create a new pool with the given configuration and factory.
    ///
    /// The factory is the only place values come from; its failures surface
    /// from [`acquire`](Pool::acquire) as
    /// [`Error::CreationFailed`].
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `config` is invalid.
    pub fn new<F, Fut>(config: PoolConfig, factory: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, BoxError>> + Send + 'static,
    {
        config.validate()?;
        let max = config.max_size;
        Ok(Self {
            inner: Arc::new(PoolInner {
                factory: Box::new(move || Box::pin(factory())),
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(max),
                    in_use: HashSet::new(),
                    over_capacity: 0,
                    closed: false,
                    total_acquisitions: 0,
                    total_releases: 0,
                    created: 0,
                    destroyed: 0,
                }),
                semaphore: Semaphore::new(max),
            }),
        })
    }

    /// Acquire a value from the pool.
    ///
    /// Reuses an idle value when a valid one exists; otherwise constructs a
    /// fresh one through the factory. What happens at capacity depends on
    /// the configured [`ExhaustionPolicy`].
    pub async fn acquire(&self) -> Result<Lease<R>> {
        self.acquire_inner(None).await
    }

    /// Like [`acquire`](Pool::acquire), but the wait under
    /// [`ExhaustionPolicy::Block`] can be cancelled through `cancel`.
    ///
    /// Cancellation fails the call with [`Error::Cancelled`] and leaves no
    /// trace on pool state.
    pub async fn acquire_with(&self, cancel: &CancellationToken) -> Result<Lease<R>> {
        self.acquire_inner(Some(cancel)).await
    }

    async fn acquire_inner(&self, cancel: Option<&CancellationToken>) -> Result<Lease<R>> {
        let inner = &self.inner;
        if inner.state.lock().closed {
            return Err(Error::Closed);
        }

        // Capacity slot first; the checkout itself never blocks.
        let permit = match inner.config.policy {
            ExhaustionPolicy::FailFast => match inner.semaphore.try_acquire() {
                Ok(permit) => Some(permit),
                Err(TryAcquireError::Closed) => return Err(Error::Closed),
                Err(TryAcquireError::NoPermits) => {
                    let state = inner.state.lock();
                    return Err(Error::Exhausted {
                        in_use: state.in_use.len(),
                        max_size: inner.config.max_size,
                    });
                }
            },
            ExhaustionPolicy::Block => Some(self.wait_for_permit(cancel).await?),
            ExhaustionPolicy::Grow => match inner.semaphore.try_acquire() {
                Ok(permit) => Some(permit),
                Err(TryAcquireError::Closed) => return Err(Error::Closed),
                Err(TryAcquireError::NoPermits) => None,
            },
        };

        // Reuse an idle value if a valid, unexpired one exists. Discards
        // are internal maintenance, never surfaced to the caller.
        let reused = {
            let mut state = inner.state.lock();
            loop {
                let entry = match inner.config.strategy {
                    PoolStrategy::Lifo => state.idle.pop_back(),
                    PoolStrategy::Fifo => state.idle.pop_front(),
                };
                match entry {
                    Some(entry) if entry.is_expired(&inner.config) => {
                        state.destroyed += 1;
                        debug!("discarding expired idle value");
                    }
                    Some(entry) if !entry.value.is_valid() => {
                        state.destroyed += 1;
                        warn!("discarding invalid idle value");
                    }
                    Some(entry) => break Some((entry.value, entry.created_at)),
                    None => break None,
                }
            }
        };

        let (value, created_at) = match reused {
            Some(reused) => reused,
            None => {
                // The expensive path. On failure the permit drops back into
                // the semaphore untouched.
                let value = (inner.factory)().await.map_err(|source| {
                    warn!(error = %source, "factory failed to produce a value");
                    Error::CreationFailed { source }
                })?;
                inner.state.lock().created += 1;
                (value, Instant::now())
            }
        };

        let id = Uuid::new_v4();
        {
            let mut state = inner.state.lock();
            state.in_use.insert(id);
            state.total_acquisitions += 1;
            if permit.is_none() {
                state.over_capacity += 1;
            }
        }
        if let Some(permit) = permit {
            // Returned via add_permits when the value checks back in.
            permit.forget();
        }
        debug!(lease_id = %id, "value lent out");

        Ok(Lease::new(value, id, created_at, Arc::downgrade(inner)))
    }

    async fn wait_for_permit(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<SemaphorePermit<'_>> {
        let inner = &self.inner;
        // Fast path: a free slot needs neither the timeout nor the token.
        if let Ok(permit) = inner.semaphore.try_acquire() {
            return Ok(permit);
        }
        let wait = tokio::time::timeout(inner.config.acquire_timeout, inner.semaphore.acquire());
        let acquired = match cancel {
            Some(token) => tokio::select! {
                () = token.cancelled() => return Err(Error::Cancelled),
                acquired = wait => acquired,
            },
            None => wait.await,
        };
        match acquired {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => Err(Error::Timeout {
                waited: inner.config.acquire_timeout,
            }),
        }
    }

    /// Return a lent value to the pool.
    ///
    /// The value is [`reset`](Pooled::reset) and, if still valid, becomes
    /// available for reuse; a value invalidated by its reset is discarded
    /// and its capacity replenishes on the next acquire.
    ///
    /// # Errors
    /// Releasing a lease this pool does not currently own (already
    /// released, or issued by a different pool) is a caller bug and fails
    /// with [`Error::InvalidRelease`] without touching pool state.
    pub fn release(&self, lease: &mut Lease<R>) -> Result<()> {
        let id = lease.id();
        let Some(value) = lease.take_value() else {
            return Err(Error::InvalidRelease {
                lease_id: id,
                kind: InvalidReleaseKind::AlreadyReleased,
            });
        };
        if !std::ptr::eq(lease.pool_ptr(), Arc::as_ptr(&self.inner)) {
            // Hand the value back so the lease still checks in to its own
            // pool on drop.
            lease.put_back(value);
            warn!(lease_id = %id, "rejected release of foreign lease");
            return Err(Error::InvalidRelease {
                lease_id: id,
                kind: InvalidReleaseKind::ForeignPool,
            });
        }
        self.inner.check_in(id, value, lease.created_at());
        Ok(())
    }

    /// Get a snapshot of current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            available: state.idle.len(),
            in_use: state.in_use.len(),
            total_acquisitions: state.total_acquisitions,
            total_releases: state.total_releases,
            created: state.created,
            destroyed: state.destroyed,
        }
    }

    /// Run maintenance: evict expired idle values, then top the pool back
    /// up to [`min_size`](PoolConfig::min_size).
    ///
    /// # Errors
    /// Returns [`Error::CreationFailed`] if the factory fails while
    /// replenishing; eviction always completes first.
    pub async fn maintain(&self) -> Result<()> {
        let inner = &self.inner;
        let evicted = {
            let mut state = inner.state.lock();
            let mut kept = VecDeque::with_capacity(state.idle.len());
            let mut evicted = Vec::new();
            while let Some(entry) = state.idle.pop_front() {
                if entry.is_expired(&inner.config) {
                    evicted.push(entry.value);
                } else {
                    kept.push_back(entry);
                }
            }
            state.idle = kept;
            state.destroyed += evicted.len() as u64;
            evicted
        };
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted expired idle values");
        }
        drop(evicted);

        loop {
            {
                let state = inner.state.lock();
                if state.closed || state.idle.len() + state.in_use.len() >= inner.config.min_size {
                    break;
                }
            }
            // Create under a held permit; idle values themselves hold none.
            let Ok(permit) = inner.semaphore.try_acquire() else {
                break;
            };
            match (inner.factory)().await {
                Ok(value) => {
                    let mut state = inner.state.lock();
                    state.created += 1;
                    state.idle.push_back(Entry::new(value));
                }
                Err(source) => {
                    warn!(error = %source, "factory failed during maintenance");
                    drop(permit);
                    return Err(Error::CreationFailed { source });
                }
            }
            drop(permit);
        }
        Ok(())
    }

    /// Close the pool: drop all idle values and fail subsequent acquires
    /// with [`Error::Closed`]. Blocked waiters are woken and fail promptly.
    ///
    /// Outstanding leases keep working; their values are dropped on
    /// check-in.
    pub fn close(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.destroyed += drained.len() as u64;
            drained
        };
        // Caller values drop outside the lock.
        drop(drained);
        self.inner.semaphore.close();
        debug!("pool closed");
    }

    /// Whether [`close`](Pool::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

impl<R: Pooled> PoolInner<R> {
    /// Check a value back in: reset, revalidate, re-admit or discard.
    pub(crate) fn check_in(&self, id: Uuid, mut value: R, created_at: Instant) {
        value.reset();
        let returned_permit = {
            let mut state = self.state.lock();
            if !state.in_use.remove(&id) {
                warn!(lease_id = %id, "check-in for a lease the pool does not own");
                return;
            }
            state.total_releases += 1;
            if state.over_capacity > 0 {
                // Shrink back under the soft limit: surplus values are not
                // re-admitted and return no permit.
                state.over_capacity -= 1;
                state.destroyed += 1;
                false
            } else {
                if state.closed {
                    state.destroyed += 1;
                } else if value.is_valid() {
                    state.idle.push_back(Entry::returned(value, created_at));
                } else {
                    warn!(lease_id = %id, "discarding value invalidated by reset");
                    state.destroyed += 1;
                }
                true
            }
        };
        if returned_permit {
            self.semaphore.add_permits(1);
        }
    }

    /// Forget a lease whose value was detached from pool management.
    pub(crate) fn forget(&self, id: Uuid) {
        let returned_permit = {
            let mut state = self.state.lock();
            if !state.in_use.remove(&id) {
                return;
            }
            state.destroyed += 1;
            if state.over_capacity > 0 {
                state.over_capacity -= 1;
                false
            } else {
                true
            }
        };
        if returned_permit {
            self.semaphore.add_permits(1);
        }
    }
}
