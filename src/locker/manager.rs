//! The public lock manager.

use super::collector::Collector;
use super::context::{Limit, LockContext};
use super::guard::{Held, KeyGuard, LockMode};
use super::registry::Registry;
use super::stats::LockerStats;
use crate::config::LockerConfig;
use crate::error::{KeylockError, Result};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Hands out exclusive or shared locks identified by string keys.
///
/// Lock state for a key is created on first use and reclaimed by the sweep
/// once nobody holds it. Two acquisition styles are offered:
///
/// - [`write_lock`](Self::write_lock) / [`read_lock`](Self::read_lock) block
///   until the lock is granted.
/// - [`simple_lock`](Self::simple_lock) polls a non-blocking probe at the
///   configured retry interval and gives up with
///   [`KeylockError::LockTimeout`] at the deadline.
///
/// Every acquisition returns a [`KeyGuard`]; dropping it releases the key.
/// No deadlock detection is done: callers holding several keys at once must
/// take them in a consistent order.
#[derive(Debug)]
pub struct KeyLocker {
    pub(super) registry: Arc<Registry>,
    config: LockerConfig,
    collector: Option<Collector>,
}

impl KeyLocker {
    /// Create a locker. Starts the background sweep when `gc_interval_ms` is
    /// non-zero.
    ///
    /// # Returns
    ///
    /// * `Ok(KeyLocker)` - Ready to use
    /// * `Err(KeylockError::ConfigError)` - The config failed validation
    /// * `Err(KeylockError::RuntimeError)` - The collector thread could not start
    pub fn new(config: LockerConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(Registry::new());
        let collector = match config.gc_interval() {
            Some(interval) => Some(Collector::spawn(Arc::clone(&registry), interval)?),
            None => None,
        };

        Ok(Self {
            registry,
            config,
            collector,
        })
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    /// Block until `key` is held exclusively.
    pub fn write_lock(&self, key: &str) -> KeyGuard {
        self.acquire_blocking(key, LockMode::Exclusive)
    }

    /// Block until `key` is held shared. Any number of readers may hold a key
    /// at the same time.
    pub fn read_lock(&self, key: &str) -> KeyGuard {
        self.acquire_blocking(key, LockMode::Shared)
    }

    /// Exclusive lock bounded by the configured `acquire_timeout`.
    pub fn simple_lock(&self, key: &str) -> Result<KeyGuard> {
        self.simple_lock_with_context(key, &LockContext::new())
    }

    /// Exclusive lock bounded by `ctx`.
    ///
    /// Probes the lock without blocking, sleeping `retry_interval` between
    /// attempts, until it is granted, the deadline passes or `ctx` is
    /// cancelled. A context without a deadline uses the configured
    /// `acquire_timeout`; an unbounded one waits until granted or cancelled.
    /// On timeout no holder count is touched.
    pub fn simple_lock_with_context(&self, key: &str, ctx: &LockContext) -> Result<KeyGuard> {
        let started = Instant::now();
        let deadline = match ctx.limit() {
            Limit::At(deadline) => Some(deadline),
            Limit::Configured => started.checked_add(self.config.acquire_timeout()),
            Limit::Unbounded => None,
        };
        let retry = self.config.retry_interval();

        let mut entry = self.registry.get_or_create(key);
        loop {
            let now = Instant::now();
            if ctx.is_cancelled() || deadline.is_some_and(|d| now >= d) {
                return Err(KeylockError::LockTimeout {
                    key: key.to_string(),
                    waited: started.elapsed(),
                });
            }

            if let Some(held) = entry.lock().try_write_arc() {
                let guard = KeyGuard::new(key, Arc::clone(&entry), Held::Exclusive(held));
                if self.registry.is_current(key, guard.entry()) {
                    return Ok(guard);
                }
                drop(guard);
                tracing::debug!(key, "lock entry was swept while acquiring, retrying");
                entry = self.registry.get_or_create(key);
                continue;
            }

            let pause = match deadline {
                Some(d) => retry.min(d.saturating_duration_since(now)),
                None => retry,
            };
            thread::sleep(pause);
        }
    }

    /// Release a guard. Same as dropping it.
    pub fn release(&self, guard: KeyGuard) {
        guard.release();
    }

    /// Number of keys with live lock state.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` currently has lock state. Does not create it.
    pub fn contains(&self, key: &str) -> bool {
        self.registry.get(key).is_some()
    }

    /// Live holders of `key`, or `None` if the key has no lock state.
    pub fn holders(&self, key: &str) -> Option<usize> {
        self.registry.get(key).map(|entry| entry.holders())
    }

    /// Run one sweep now, regardless of the background collector. Returns the
    /// number of entries removed.
    pub fn sweep(&self) -> usize {
        self.registry.sweep()
    }

    pub fn stats(&self) -> LockerStats {
        let counters = self.registry.counters();
        LockerStats {
            entries: self.registry.len(),
            held_entries: self.registry.held_entries(),
            sweeps: counters.sweeps(),
            collected: counters.collected(),
            last_sweep: counters.last_sweep(),
            gc_enabled: self.collector.is_some(),
        }
    }

    /// The configured sweep interval, if the collector is running.
    pub fn gc_interval(&self) -> Option<Duration> {
        self.collector.as_ref().and(self.config.gc_interval())
    }

    fn acquire_blocking(&self, key: &str, mode: LockMode) -> KeyGuard {
        loop {
            let entry = self.registry.get_or_create(key);
            let held = match mode {
                LockMode::Exclusive => Held::Exclusive(entry.lock().write_arc()),
                LockMode::Shared => Held::Shared(entry.lock().read_arc()),
            };

            let guard = KeyGuard::new(key, entry, held);
            if self.registry.is_current(key, guard.entry()) {
                return guard;
            }
            // Swept between lookup and grant; a fresh entry now owns the key.
            drop(guard);
            tracing::debug!(key, %mode, "lock entry was swept while acquiring, retrying");
        }
    }
}
