//! RAII release handle for an acquired key.

use super::entry::LockEntry;
use parking_lot::RawRwLock;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// How a key is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Sole holder (`write_lock`, `simple_lock`).
    Exclusive,
    /// One of possibly many readers (`read_lock`).
    Shared,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Exclusive => write!(f, "exclusive"),
            LockMode::Shared => write!(f, "shared"),
        }
    }
}

/// A granted lock. The guards are only kept so dropping them unlocks.
pub(super) enum Held {
    Exclusive(#[allow(dead_code)] ArcRwLockWriteGuard<RawRwLock, ()>),
    Shared(#[allow(dead_code)] ArcRwLockReadGuard<RawRwLock, ()>),
}

/// Release handle returned by every successful acquisition.
///
/// Dropping the guard (or calling [`KeyGuard::release`]) gives the lock back
/// and then decrements the entry's holder count. The guard keeps the entry
/// alive on its own, so a sweep that unregisters the entry in the meantime
/// cannot pull it out from under the holder.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard {
    key: String,
    entry: Arc<LockEntry>,
    held: Option<Held>,
}

impl KeyGuard {
    /// Wrap a freshly granted lock. Counts as the holder increment.
    pub(super) fn new(key: &str, entry: Arc<LockEntry>, held: Held) -> Self {
        entry.add_holder();
        Self {
            key: key.to_string(),
            entry,
            held: Some(held),
        }
    }

    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> LockMode {
        match self.held {
            Some(Held::Shared(_)) => LockMode::Shared,
            _ => LockMode::Exclusive,
        }
    }

    /// Release the key now.
    pub fn release(self) {
        drop(self);
    }

    pub(crate) fn entry(&self) -> &Arc<LockEntry> {
        &self.entry
    }

    fn unlock(&mut self) {
        if let Some(held) = self.held.take() {
            // Unlock before decrementing: while the count is non-zero the
            // sweep cannot hand the key to a fresh entry.
            drop(held);
            self.entry.remove_holder();
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.unlock();
    }
}

impl fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .field("mode", &self.mode())
            .finish()
    }
}
