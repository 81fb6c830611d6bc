//! Sweep counters and the public stats snapshot.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a [`crate::KeyLocker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockerStats {
    /// Entries currently in the registry.
    pub entries: usize,

    /// Entries with at least one live holder.
    pub held_entries: usize,

    /// Sweeps run so far (background and manual).
    pub sweeps: u64,

    /// Entries removed by all sweeps so far.
    pub collected: u64,

    /// When the last sweep finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sweep: Option<DateTime<Utc>>,

    /// Whether a background collector is running.
    pub gc_enabled: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SweepCounters {
    sweeps: AtomicU64,
    collected: AtomicU64,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

impl SweepCounters {
    pub(crate) fn record(&self, removed: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.collected.fetch_add(removed as u64, Ordering::Relaxed);
        *self.last_sweep.lock() = Some(Utc::now());
    }

    pub(crate) fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub(crate) fn collected(&self) -> u64 {
        self.collected.load(Ordering::Relaxed)
    }

    pub(crate) fn last_sweep(&self) -> Option<DateTime<Utc>> {
        *self.last_sweep.lock()
    }
}
