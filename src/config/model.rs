//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`crate::KeyLocker`].
///
/// Durations are stored as whole milliseconds so the YAML form stays plain
/// integers. Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    /// Fixed poll period of the bounded-retry lock.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Default deadline for bounded-retry locks.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Period of the background sweep (0 disables the collector).
    #[serde(default = "default_gc_interval_ms")]
    pub gc_interval_ms: u64,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            gc_interval_ms: default_gc_interval_ms(),
        }
    }
}

impl LockerConfig {
    /// Set the retry interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = duration_to_ms(interval);
        self
    }

    /// Set the default acquisition timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// Set the sweep interval. [`Duration::ZERO`] disables the collector.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval_ms = duration_to_ms(interval);
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// The sweep interval, or `None` when the collector is disabled.
    pub fn gc_interval(&self) -> Option<Duration> {
        (self.gc_interval_ms > 0).then(|| Duration::from_millis(self.gc_interval_ms))
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
