//! Connection pooling example.
//!
//! Pools fake database connections, showing reuse, fail-fast exhaustion,
//! and the stats snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lendpool::{BoxError, Pool, PoolConfig, Pooled};

/// A fake connection: expensive to open, cheap to reset.
#[derive(Debug)]
struct Connection {
    serial: u64,
    queries_run: u64,
}

impl Connection {
    fn query(&mut self, sql: &str) {
        self.queries_run += 1;
        println!("conn #{} ran: {sql}", self.serial);
    }
}

impl Pooled for Connection {
    fn reset(&mut self) {
        self.queries_run = 0;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let opened = Arc::new(AtomicU64::new(0));
    let factory_opened = Arc::clone(&opened);
    let pool = Pool::new(
        PoolConfig {
            max_size: 2,
            ..Default::default()
        },
        move || {
            let serial = factory_opened.fetch_add(1, Ordering::SeqCst);
            async move {
                // Simulate an expensive connect.
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, BoxError>(Connection {
                    serial,
                    queries_run: 0,
                })
            }
        },
    )?;

    // First checkout constructs; the release keeps the connection warm.
    let mut conn = pool.acquire().await?;
    conn.query("select 1");
    pool.release(&mut conn)?;

    // Second checkout reuses the same connection, freshly reset.
    let mut conn = pool.acquire().await?;
    assert_eq!(conn.queries_run, 0);
    conn.query("select 2");

    // Capacity is bounded: with both slots lent out, acquire fails fast.
    let second = pool.acquire().await?;
    match pool.acquire().await {
        Err(err) if err.is_retryable() => println!("pool exhausted, retry later: {err}"),
        other => println!("unexpected: {other:?}"),
    }
    drop(second);

    pool.release(&mut conn)?;

    let stats = pool.stats();
    println!(
        "opened {} connections for {} checkouts ({} idle now)",
        opened.load(Ordering::SeqCst),
        stats.total_acquisitions,
        stats.available,
    );

    Ok(())
}
