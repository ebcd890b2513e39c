//! Error types for pool operations.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Boxed source error produced by resource factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a release attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReleaseKind {
    /// The lease was already released or detached.
    AlreadyReleased,
    /// The lease was issued by a different pool.
    ForeignPool,
}

impl std::fmt::Display for InvalidReleaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyReleased => f.write_str("lease was already released"),
            Self::ForeignPool => f.write_str("lease belongs to a different pool"),
        }
    }
}

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// The factory could not produce a usable resource.
    ///
    /// The pool does not retry creation; the caller decides.
    #[error("resource creation failed: {source}")]
    CreationFailed {
        /// The underlying factory error
        #[source]
        source: BoxError,
    },

    /// No idle resource exists and capacity is fully allocated.
    #[error("pool exhausted: {in_use}/{max_size} in use")]
    Exhausted {
        /// Number of values currently lent out
        in_use: usize,
        /// Configured capacity bound
        max_size: usize,
    },

    /// A blocking acquire exceeded its wait budget.
    #[error("acquire timed out after {}ms", waited.as_millis())]
    Timeout {
        /// How long the caller waited
        waited: Duration,
    },

    /// A blocking acquire was cancelled while waiting.
    #[error("acquire cancelled while waiting for capacity")]
    Cancelled,

    /// A release was attempted with a lease the pool does not own.
    ///
    /// This is a caller bug (double release or cross-pool release), surfaced
    /// loudly because ignoring it would corrupt the pool's ownership
    /// bookkeeping. Pool state is untouched.
    #[error("invalid release of lease {lease_id}: {kind}")]
    InvalidRelease {
        /// The offending lease
        lease_id: Uuid,
        /// What made the release invalid
        kind: InvalidReleaseKind,
    },

    /// The pool has been closed.
    #[error("pool is closed")]
    Closed,
}

impl Error {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a factory error.
    pub fn creation_failed<E: Into<BoxError>>(source: E) -> Self {
        Self::CreationFailed {
            source: source.into(),
        }
    }

    /// Whether the operation may succeed if retried later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Timeout { .. })
    }

    /// Whether this error indicates a defect in caller code rather than a
    /// runtime condition.
    #[must_use]
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, Self::InvalidRelease { .. })
    }
}
