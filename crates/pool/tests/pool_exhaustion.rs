//! Pool exhaustion and recovery tests under the fail-fast policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lendpool::{BoxError, Error, Pool, PoolConfig, Pooled};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Conn {
    serial: u64,
}

impl Pooled for Conn {}

fn pool(max_size: usize) -> Pool<Conn> {
    let counter = Arc::new(AtomicU64::new(0));
    Pool::new(
        PoolConfig {
            max_size,
            ..Default::default()
        },
        move || {
            let serial = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, BoxError>(Conn { serial }) }
        },
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Exhaustion boundary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exhaustion_returns_error() {
    let pool = pool(2);

    let _a1 = pool.acquire().await.expect("first acquire should succeed");
    let _a2 = pool.acquire().await.expect("second acquire should succeed");

    let err = pool.acquire().await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Exhausted {
                in_use: 2,
                max_size: 2
            }
        ),
        "expected Exhausted, got: {err:?}"
    );
}

#[tokio::test]
async fn nth_plus_one_acquire_fails_at_boundary() {
    let max_size = 4;
    let pool = pool(max_size);

    let mut leases = Vec::new();
    for i in 0..max_size {
        leases.push(
            pool.acquire()
                .await
                .unwrap_or_else(|e| panic!("acquire {i} should succeed: {e}")),
        );
    }
    assert!(matches!(
        pool.acquire().await,
        Err(Error::Exhausted { .. })
    ));

    let stats = pool.stats();
    assert_eq!(stats.in_use, max_size);
    assert_eq!(stats.total_acquisitions, max_size as u64);
}

#[tokio::test]
async fn exhausted_error_is_retryable() {
    let pool = pool(1);

    let _a1 = pool.acquire().await.unwrap();
    let err = pool.acquire().await.unwrap_err();

    assert!(err.is_retryable(), "Exhausted should be retryable");
    assert!(!err.is_caller_bug());
}

// ---------------------------------------------------------------------------
// Recovery and reuse after release
// ---------------------------------------------------------------------------

#[tokio::test]
async fn released_value_is_reused_by_next_acquire() {
    let pool = pool(2);

    let mut a1 = pool.acquire().await.unwrap();
    let _a2 = pool.acquire().await.unwrap();
    let a1_serial = a1.serial;

    assert!(matches!(
        pool.acquire().await,
        Err(Error::Exhausted { .. })
    ));

    pool.release(&mut a1).unwrap();

    let a3 = pool.acquire().await.expect("capacity freed by release");
    assert_eq!(
        a3.serial, a1_serial,
        "acquire after release should reuse the returned value"
    );
    assert_eq!(pool.stats().created, 2, "no third value was constructed");
}

#[tokio::test]
async fn no_double_lend_with_capacity_one() {
    let pool = pool(1);

    let mut a1 = pool.acquire().await.unwrap();
    assert!(
        pool.acquire().await.is_err(),
        "second acquire must not lend the same value"
    );

    pool.release(&mut a1).unwrap();
    let a2 = pool.acquire().await.unwrap();
    assert_eq!(a2.serial, 0, "same underlying value, lent sequentially");
    assert_eq!(pool.stats().in_use, 1);
}
