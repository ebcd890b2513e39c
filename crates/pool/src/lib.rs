//! # lendpool
//!
//! Bounded object pool with validity-checked reuse.
//!
//! A [`Pool`] owns up to `max_size` values of a type implementing the
//! [`Pooled`] contract, constructing them lazily through an async factory
//! and lending each one to exactly one caller at a time as a [`Lease`].
//! Released values are reset, revalidated, and kept warm for reuse;
//! values that report themselves invalid are discarded and replaced on
//! demand.
//!
//! ```no_run
//! use lendpool::{BoxError, Pool, PoolConfig, Pooled};
//!
//! struct Conn {
//!     dirty: bool,
//! }
//!
//! impl Pooled for Conn {
//!     fn reset(&mut self) {
//!         self.dirty = false;
//!     }
//! }
//!
//! # async fn demo() -> lendpool::Result<()> {
//! let pool = Pool::new(PoolConfig::default(), || async {
//!     Ok::<_, BoxError>(Conn { dirty: false })
//! })?;
//! let mut conn = pool.acquire().await?;
//! conn.dirty = true;
//! pool.release(&mut conn)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lease;
pub mod pool;
pub mod pooled;

pub use config::{ExhaustionPolicy, PoolConfig, PoolStrategy};
pub use error::{BoxError, Error, InvalidReleaseKind, Result};
pub use lease::Lease;
pub use pool::{Pool, PoolStats};
pub use pooled::Pooled;
