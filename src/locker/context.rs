//! Deadline and cancellation for bounded-retry acquisition.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A cloneable cancellation flag.
///
/// Every clone observes the same flag; cancelling any of them cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Pending acquisitions notice it on their next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How far a bounded-retry attempt may wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Limit {
    /// Use the locker's configured `acquire_timeout`.
    #[default]
    Configured,
    /// Give up at this instant.
    At(Instant),
    /// Wait until granted or cancelled.
    Unbounded,
}

/// Bounds a [`crate::KeyLocker::simple_lock_with_context`] call.
///
/// A context without a deadline falls back to the locker's configured
/// `acquire_timeout`. Cancellation is always honoured, deadline or not.
#[derive(Debug, Clone, Default)]
pub struct LockContext {
    limit: Limit,
    cancel: Option<CancelToken>,
}

impl LockContext {
    /// A context with no deadline and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now. A timeout past what
    /// `Instant` can represent never expires.
    pub fn with_timeout(timeout: Duration) -> Self {
        let limit = match Instant::now().checked_add(timeout) {
            Some(deadline) => Limit::At(deadline),
            None => Limit::Unbounded,
        };
        Self {
            limit,
            cancel: None,
        }
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            limit: Limit::At(deadline),
            cancel: None,
        }
    }

    /// A context that never expires; only cancellation ends the wait.
    pub fn unbounded() -> Self {
        Self {
            limit: Limit::Unbounded,
            cancel: None,
        }
    }

    /// Attach a cancellation token.
    pub fn cancelled_by(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.limit {
            Limit::At(deadline) => Some(deadline),
            Limit::Configured | Limit::Unbounded => None,
        }
    }

    /// Whether the context explicitly opts out of any deadline.
    pub fn is_unbounded(&self) -> bool {
        self.limit == Limit::Unbounded
    }

    pub(crate) fn limit(&self) -> Limit {
        self.limit
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
