//! Owning lease handles issued by the pool.

use std::sync::Weak;
use std::time::Instant;

use tracing::warn;
use uuid::Uuid;

use crate::pool::PoolInner;
use crate::pooled::Pooled;

/// An exclusively owned value checked out of a [`Pool`](crate::Pool).
///
/// Derefs to the pooled value. Check the value back in explicitly with
/// [`Pool::release`](crate::Pool::release) to observe release errors, or
/// simply drop the lease; both paths reset and revalidate the value before
/// it becomes available again.
///
/// The lease carries only an opaque id and a weak back-reference for
/// pool-side lookup; it never keeps the pool alive.
pub struct Lease<R: Pooled> {
    value: Option<R>,
    id: Uuid,
    created_at: Instant,
    pool: Weak<PoolInner<R>>,
}

impl<R: Pooled> Lease<R> {
    pub(crate) fn new(value: R, id: Uuid, created_at: Instant, pool: Weak<PoolInner<R>>) -> Self {
        Self {
            value: Some(value),
            id,
            created_at,
            pool,
        }
    }

    /// Opaque identifier of this lease, unique within its pool.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Take the value out of pool management entirely.
    ///
    /// The capacity slot is freed; the pool constructs a replacement on
    /// demand.
    #[must_use]
    pub fn detach(mut self) -> R {
        let value = self.value.take().expect("lease used after release");
        if let Some(inner) = self.pool.upgrade() {
            inner.forget(self.id);
        }
        value
    }

    pub(crate) fn take_value(&mut self) -> Option<R> {
        self.value.take()
    }

    pub(crate) fn put_back(&mut self, value: R) {
        self.value = Some(value);
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    pub(crate) fn pool_ptr(&self) -> *const PoolInner<R> {
        self.pool.as_ptr()
    }
}

impl<R: Pooled> std::ops::Deref for Lease<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.value.as_ref().expect("lease used after release")
    }
}

impl<R: Pooled> std::ops::DerefMut for Lease<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.value.as_mut().expect("lease used after release")
    }
}

impl<R: Pooled> Drop for Lease<R> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            match self.pool.upgrade() {
                Some(inner) => inner.check_in(self.id, value, self.created_at),
                None => warn!(lease_id = %self.id, "lease dropped after its pool was dropped"),
            }
        }
    }
}

impl<R: Pooled + std::fmt::Debug> std::fmt::Debug for Lease<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}
