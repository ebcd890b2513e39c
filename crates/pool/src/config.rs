//! Pool configuration types.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Behavior of `acquire` when no idle value exists and capacity is reached.
///
/// Chosen once per pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExhaustionPolicy {
    /// Fail immediately with [`Error::Exhausted`](crate::Error::Exhausted).
    #[default]
    FailFast,
    /// Wait for a slot to free up, bounded by
    /// [`acquire_timeout`](PoolConfig::acquire_timeout).
    Block,
    /// Exceed `max_size` transiently; surplus values are discarded as they
    /// are released.
    Grow,
}

/// Order in which idle values are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PoolStrategy {
    /// Last In, First Out - keeps recently used values warm.
    #[default]
    Lifo,
    /// First In, First Out - spreads load evenly across values.
    Fifo,
}

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Upper bound on live values (idle + lent out).
    pub max_size: usize,
    /// Idle values [`maintain`](crate::Pool::maintain) keeps on hand.
    ///
    /// Zero by default: values are constructed strictly on demand.
    pub min_size: usize,
    /// Wait budget for an acquire under [`ExhaustionPolicy::Block`].
    pub acquire_timeout: Duration,
    /// Time after which an idle value is discarded.
    pub idle_timeout: Duration,
    /// Maximum lifetime of a value, idle or not.
    pub max_lifetime: Duration,
    /// What `acquire` does when the pool is exhausted.
    pub policy: ExhaustionPolicy,
    /// Reuse order for idle values.
    pub strategy: PoolStrategy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_size: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
            policy: ExhaustionPolicy::default(),
            strategy: PoolStrategy::default(),
        }
    }
}

impl PoolConfig {
    /// Validate the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::configuration("max_size must be greater than 0"));
        }
        if self.min_size > self.max_size {
            return Err(Error::configuration(format!(
                "min_size ({}) must not exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.policy == ExhaustionPolicy::Block && self.acquire_timeout.is_zero() {
            return Err(Error::configuration(
                "acquire_timeout must be greater than zero under the Block policy",
            ));
        }
        Ok(())
    }
}
