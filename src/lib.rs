//! Keylock: an in-process keyed lock manager.
//!
//! Hands out exclusive or shared locks identified by arbitrary string keys,
//! creating the lock state on first use and sweeping it once idle.
//!
//! ```no_run
//! use keylock::{KeyLocker, LockContext, LockerConfig};
//! use std::time::Duration;
//!
//! let config = LockerConfig::default().with_gc_interval(Duration::from_secs(60));
//! let locker = KeyLocker::new(config)?;
//!
//! // One in-flight request per user.
//! let guard = locker.simple_lock("user-42")?;
//! drop(guard);
//!
//! // Readers share, writers exclude.
//! let reader = locker.read_lock("session-abc");
//! reader.release();
//!
//! let ctx = LockContext::with_timeout(Duration::from_millis(500));
//! let guard = locker.simple_lock_with_context("session-abc", &ctx)?;
//! locker.release(guard);
//! # Ok::<(), keylock::KeylockError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod locker;

pub use config::LockerConfig;
pub use error::{KeylockError, Result};
pub use locker::{CancelToken, KeyGuard, KeyLocker, LockContext, LockMode, LockerStats};
