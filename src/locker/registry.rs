//! Key to entry map with lazy creation and the two-phase sweep.
//!
//! Lookups, inserts and sweep deletions all go through the one
//! `RwLock` guarding the map. Giving the sweep its own lock would let a
//! deletion race a concurrent get-or-create and lose an entry.

use super::entry::LockEntry;
use super::stats::SweepCounters;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: RwLock<HashMap<String, Arc<LockEntry>>>,
    counters: SweepCounters,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key`, creating it on first use.
    ///
    /// The common case (key already known) only takes the shared side of the
    /// map lock.
    pub(crate) fn get_or_create(&self, key: &str) -> Arc<LockEntry> {
        if let Some(entry) = self.entries.read().get(key) {
            return Arc::clone(entry);
        }

        let mut entries = self.entries.write();

        // Another caller may have inserted the key between the two phases.
        if let Some(entry) = entries.get(key) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(LockEntry::new());
        entries.insert(key.to_string(), Arc::clone(&entry));
        tracing::trace!(key, "created lock entry");
        entry
    }

    /// Look up `key` without creating it.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<LockEntry>> {
        self.entries.read().get(key).cloned()
    }

    /// Whether `entry` is still the one registered under `key`.
    pub(crate) fn is_current(&self, key: &str, entry: &Arc<LockEntry>) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|registered| Arc::ptr_eq(registered, entry))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn held_entries(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.holders() > 0)
            .count()
    }

    pub(crate) fn counters(&self) -> &SweepCounters {
        &self.counters
    }

    /// Remove every entry without holders. Returns how many were removed.
    ///
    /// Candidates are collected under the shared lock, then each one is
    /// re-read under the exclusive lock and only deleted if its count is
    /// still zero.
    pub(crate) fn sweep(&self) -> usize {
        let garbage: Vec<String> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, entry)| entry.holders() == 0)
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut removed = 0;
        if !garbage.is_empty() {
            let mut entries = self.entries.write();
            for key in garbage {
                if entries.get(&key).is_some_and(|entry| entry.holders() == 0) {
                    entries.remove(&key);
                    removed += 1;
                }
            }
        }

        self.counters.record(removed);
        removed
    }
}
