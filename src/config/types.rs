//! Default values for config fields.

/// Poll period of the bounded-retry lock.
pub(crate) fn default_retry_interval_ms() -> u64 {
    250
}

/// Deadline applied to bounded-retry locks that carry none of their own.
pub(crate) fn default_acquire_timeout_ms() -> u64 {
    3_000
}

/// Sweep period of the collector. Zero disables it.
pub(crate) fn default_gc_interval_ms() -> u64 {
    0
}
