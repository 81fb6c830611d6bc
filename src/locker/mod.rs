//! Keyed lock manager.
//!
//! A [`KeyLocker`] maps arbitrary string keys to lock entries:
//! - Entries are created lazily on first use of a key
//! - Each entry is a shared/exclusive lock plus a live-holder count
//! - A background sweep removes entries nobody holds
//!
//! # Acquisition
//!
//! `write_lock` and `read_lock` wait as long as it takes. `simple_lock`
//! polls a non-blocking probe and fails with `LockTimeout` once its
//! [`LockContext`] deadline passes or is cancelled.
//!
//! # Release
//!
//! Every acquisition returns a [`KeyGuard`]. Dropping it releases the key,
//! so releasing a key that was never acquired cannot be expressed.
//!
//! # Sweep
//!
//! The sweep snapshots idle keys under the registry's shared lock, then
//! re-reads each holder count under the exclusive lock and deletes only
//! entries that are still idle. An acquisition that raced a deletion notices
//! that its entry is no longer registered and retries on a fresh one.

mod collector;
mod context;
mod entry;
mod guard;
mod manager;
mod registry;
mod stats;

#[cfg(test)]
mod tests;

// Re-export public API
pub use context::{CancelToken, LockContext};
pub use guard::{KeyGuard, LockMode};
pub use manager::KeyLocker;
pub use stats::LockerStats;
