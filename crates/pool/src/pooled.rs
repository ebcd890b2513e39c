//! The capability contract poolable types satisfy.

/// Contract for values managed by a [`Pool`](crate::Pool).
///
/// The pool calls [`reset`](Pooled::reset) when a value is checked back in
/// and [`is_valid`](Pooled::is_valid) before lending a value out again.
/// Expensive setup (an open connection, a spawned worker) is expected to
/// survive `reset`; only use-specific state is cleared.
///
/// Both methods are synchronous and infallible: `is_valid` is a
/// side-effect-free query, and a value that cannot be safely reset must
/// report `is_valid() == false` afterwards so the pool discards it instead
/// of lending it out.
pub trait Pooled: Send + 'static {
    /// Clear use-specific state so the value is ready for the next caller.
    ///
    /// Must be idempotent.
    fn reset(&mut self) {}

    /// Whether the value is safe to lend out.
    fn is_valid(&self) -> bool {
        true
    }
}
