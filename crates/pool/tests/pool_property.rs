//! Property tests for pool acquire/release invariants.
//!
//! After any sequence of acquire/release operations,
//! `stats.available + stats.in_use <= max_size` always holds, and every
//! lent value is owned by exactly one lease.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lendpool::{BoxError, Pool, PoolConfig, PoolStrategy, Pooled};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test resource
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Counted {
    serial: u64,
}

impl Pooled for Counted {}

fn counted_pool(max_size: usize, strategy: PoolStrategy) -> Pool<Counted> {
    let counter = Arc::new(AtomicU64::new(0));
    Pool::new(
        PoolConfig {
            max_size,
            strategy,
            ..Default::default()
        },
        move || {
            let serial = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, BoxError>(Counted { serial }) }
        },
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Property: available + in_use <= max_size across arbitrary op sequences
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pool_invariants_hold_across_op_sequences(
        max_size in 1usize..8,
        ops in proptest::collection::vec(prop_oneof![Just(true), Just(false)], 1..40),
        strategy in prop_oneof![Just(PoolStrategy::Lifo), Just(PoolStrategy::Fifo)],
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let pool = counted_pool(max_size, strategy);
            let mut leases = Vec::new();

            for op_is_acquire in &ops {
                if *op_is_acquire {
                    // May fail with Exhausted under fail-fast; that is fine.
                    if let Ok(lease) = pool.acquire().await {
                        leases.push(lease);
                    }
                } else if let Some(mut lease) = leases.pop() {
                    pool.release(&mut lease).unwrap();
                }

                let stats = pool.stats();
                prop_assert!(
                    stats.available + stats.in_use <= max_size,
                    "capacity invariant violated: available={} + in_use={} > max_size={}",
                    stats.available, stats.in_use, max_size,
                );
                prop_assert_eq!(
                    stats.in_use, leases.len(),
                    "every lent value is held by exactly one live lease"
                );
            }

            // Return everything and verify the pool reconciles.
            for mut lease in leases {
                pool.release(&mut lease).unwrap();
            }
            let final_stats = pool.stats();
            prop_assert_eq!(final_stats.in_use, 0);
            prop_assert!(final_stats.available <= max_size);
            prop_assert_eq!(final_stats.total_acquisitions, final_stats.total_releases);

            Ok(())
        })?;
    }
}

// ---------------------------------------------------------------------------
// Deterministic invariant checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rapid_acquire_release_preserves_invariants() {
    let max_size = 4;
    let pool = counted_pool(max_size, PoolStrategy::Lifo);

    for _ in 0..50 {
        let mut lease = pool.acquire().await.unwrap();
        pool.release(&mut lease).unwrap();

        let stats = pool.stats();
        assert!(
            stats.available + stats.in_use <= max_size,
            "invariant violated during rapid cycling"
        );
    }

    let stats = pool.stats();
    assert_eq!(stats.created, 1, "a single value served every cycle");
    assert_eq!(stats.total_acquisitions, 50);
}

#[tokio::test]
async fn acquisitions_equal_releases_after_cleanup() {
    let pool = counted_pool(3, PoolStrategy::Lifo);

    let mut leases = Vec::new();
    for _ in 0..3 {
        leases.push(pool.acquire().await.unwrap());
    }

    let stats = pool.stats();
    assert_eq!(stats.total_acquisitions, 3);
    assert_eq!(stats.in_use, 3);

    for mut lease in leases {
        pool.release(&mut lease).unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.total_releases, 3);
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.total_acquisitions, stats.total_releases);
}

#[tokio::test]
async fn distinct_leases_never_share_a_value() {
    let pool = counted_pool(4, PoolStrategy::Lifo);

    let leases = [
        pool.acquire().await.unwrap(),
        pool.acquire().await.unwrap(),
        pool.acquire().await.unwrap(),
        pool.acquire().await.unwrap(),
    ];

    let mut serials: Vec<u64> = leases.iter().map(|l| l.serial).collect();
    serials.sort_unstable();
    serials.dedup();
    assert_eq!(serials.len(), 4, "each lease owns a distinct value");

    let mut ids: Vec<_> = leases.iter().map(lendpool::Lease::id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "lease ids are unique");
}
