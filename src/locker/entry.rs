//! Per-key lock state.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The unit of mutual exclusion for one key: a shared/exclusive lock plus a
/// count of live holders.
///
/// The holder count is only a GC signal. It moves after the lock is granted
/// and before it is given back, so zero means nobody holds the lock right now.
#[derive(Debug, Default)]
pub(crate) struct LockEntry {
    lock: Arc<RwLock<()>>,
    holders: AtomicUsize,
}

impl LockEntry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> &Arc<RwLock<()>> {
        &self.lock
    }

    pub(crate) fn holders(&self) -> usize {
        self.holders.load(Ordering::Acquire)
    }

    pub(crate) fn add_holder(&self) {
        self.holders.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn remove_holder(&self) {
        let previous = self.holders.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "lock entry holder count underflow");
    }
}
