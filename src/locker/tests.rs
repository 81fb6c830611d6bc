//! Tests for the keyed lock manager.

use super::*;
use crate::config::LockerConfig;
use crate::error::KeylockError;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn locker() -> KeyLocker {
    KeyLocker::new(LockerConfig::default()).unwrap()
}

/// Fast polling so timing tests stay short.
fn fast_locker(timeout: Duration) -> KeyLocker {
    let config = LockerConfig::default()
        .with_retry_interval(Duration::from_millis(20))
        .with_acquire_timeout(timeout);
    KeyLocker::new(config).unwrap()
}

fn gc_locker(interval: Duration) -> KeyLocker {
    KeyLocker::new(LockerConfig::default().with_gc_interval(interval)).unwrap()
}

fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

// ============================================================================
// Blocking read/write locks
// ============================================================================

#[test]
fn test_write_lock_counts_one_holder() {
    let locker = locker();

    let guard = locker.write_lock("user-1");
    assert_eq!(guard.key(), "user-1");
    assert_eq!(guard.mode(), LockMode::Exclusive);
    assert_eq!(locker.holders("user-1"), Some(1));

    guard.release();
    assert_eq!(locker.holders("user-1"), Some(0));
}

#[test]
fn test_read_locks_share_a_key() {
    let locker = locker();

    let first = locker.read_lock("session-1");
    let second = locker.read_lock("session-1");
    assert_eq!(first.mode(), LockMode::Shared);
    assert_eq!(locker.holders("session-1"), Some(2));

    drop(first);
    drop(second);
    assert_eq!(locker.holders("session-1"), Some(0));
}

#[test]
fn test_many_readers_hold_at_once() {
    const READERS: usize = 8;
    let locker = Arc::new(locker());
    let barrier = Arc::new(Barrier::new(READERS));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let locker = Arc::clone(&locker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let guard = locker.read_lock("shared");
                // Only passes if every reader holds the key simultaneously.
                barrier.wait();
                drop(guard);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(locker.holders("shared"), Some(0));
}

#[test]
fn test_writer_excludes_reader() {
    let locker = Arc::new(locker());
    let writer = locker.write_lock("doc");
    let reader_in = Arc::new(AtomicBool::new(false));

    let handle = {
        let locker = Arc::clone(&locker);
        let reader_in = Arc::clone(&reader_in);
        thread::spawn(move || {
            let _guard = locker.read_lock("doc");
            reader_in.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!reader_in.load(Ordering::SeqCst));

    locker.release(writer);
    handle.join().unwrap();
    assert!(reader_in.load(Ordering::SeqCst));
}

#[test]
fn test_mutual_exclusion_under_contention() {
    const WORKERS: usize = 8;
    const ROUNDS: usize = 2_000;
    let locker = Arc::new(locker());
    let writers = Arc::new(AtomicUsize::new(0));
    let readers = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let locker = Arc::clone(&locker);
            let writers = Arc::clone(&writers);
            let readers = Arc::clone(&readers);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    if (worker + round) % 3 == 0 {
                        let _guard = locker.write_lock("counter");
                        assert_eq!(writers.fetch_add(1, Ordering::SeqCst), 0);
                        assert_eq!(readers.load(Ordering::SeqCst), 0);
                        writers.fetch_sub(1, Ordering::SeqCst);
                    } else {
                        let _guard = locker.read_lock("counter");
                        readers.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(writers.load(Ordering::SeqCst), 0);
                        readers.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(locker.holders("counter"), Some(0));
}

#[test]
fn test_million_shared_cycles_complete() {
    const WORKERS: usize = 8;
    const CYCLES: usize = 1_000_000;
    let locker = Arc::new(locker());
    let done = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let locker = Arc::clone(&locker);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for _ in 0..CYCLES / WORKERS {
                    let guard = locker.read_lock("test");
                    guard.release();
                    done.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(done.load(Ordering::Relaxed), CYCLES);
    assert_eq!(locker.holders("test"), Some(0));
}

#[test]
fn test_guard_released_on_another_thread() {
    let locker = Arc::new(locker());
    let guard = locker.write_lock("handoff");

    thread::spawn(move || guard.release()).join().unwrap();

    assert_eq!(locker.holders("handoff"), Some(0));
    let again = locker.simple_lock("handoff").unwrap();
    drop(again);
}

// ============================================================================
// Bounded-retry lock
// ============================================================================

#[test]
fn test_simple_lock_acquires_free_key() {
    let locker = locker();

    let guard = locker.simple_lock("test").unwrap();
    assert_eq!(guard.mode(), LockMode::Exclusive);
    assert_eq!(locker.holders("test"), Some(1));

    locker.release(guard);
    assert_eq!(locker.holders("test"), Some(0));
}

#[test]
fn test_simple_lock_with_generous_context() {
    let locker = locker();
    let ctx = LockContext::with_timeout(Duration::from_secs(5));

    let guard = locker.simple_lock_with_context("test", &ctx).unwrap();
    drop(guard);
    assert_eq!(locker.holders("test"), Some(0));
}

#[test]
#[serial]
fn test_simple_lock_times_out_at_deadline() {
    let locker = fast_locker(Duration::from_secs(10));
    let holder = locker.write_lock("busy");

    let started = Instant::now();
    let ctx = LockContext::with_timeout(Duration::from_secs(1));
    let err = locker.simple_lock_with_context("busy", &ctx).unwrap_err();
    let elapsed = started.elapsed();

    match &err {
        KeylockError::LockTimeout { key, waited } => {
            assert_eq!(key, "busy");
            assert!(*waited >= Duration::from_millis(990));
        }
        other => panic!("expected LockTimeout, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_millis(990), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_500), "returned late: {elapsed:?}");
    // The failed attempt must not count as a holder.
    assert_eq!(locker.holders("busy"), Some(1));

    drop(holder);
}

#[test]
#[serial]
fn test_simple_lock_uses_default_timeout() {
    let locker = fast_locker(Duration::from_millis(300));
    let _holder = locker.simple_lock("user-9").unwrap();

    let started = Instant::now();
    let err = locker.simple_lock("user-9").unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(290));
    assert!(started.elapsed() < Duration::from_millis(800));
    assert_eq!(locker.holders("user-9"), Some(1));
}

#[test]
#[serial]
fn test_simple_lock_waits_for_release() {
    let locker = Arc::new(fast_locker(Duration::from_secs(5)));
    let holder = locker.simple_lock("test").unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        holder.release();
    });

    let started = Instant::now();
    let guard = locker.simple_lock("test").unwrap();
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(locker.holders("test"), Some(1));

    releaser.join().unwrap();
    drop(guard);
}

#[test]
#[serial]
fn test_simple_lock_observes_cancellation() {
    let locker = fast_locker(Duration::from_secs(30));
    let _holder = locker.write_lock("busy");

    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        })
    };

    let started = Instant::now();
    let ctx = LockContext::new().cancelled_by(token);
    let err = locker.simple_lock_with_context("busy", &ctx).unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(locker.holders("busy"), Some(1));
    canceller.join().unwrap();
}

#[test]
#[serial]
fn test_huge_timeout_outlives_default_timeout() {
    let locker = Arc::new(fast_locker(Duration::from_millis(200)));
    let holder = locker.write_lock("k");

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(600));
        holder.release();
    });

    let started = Instant::now();
    let ctx = LockContext::with_timeout(Duration::MAX);
    let guard = locker
        .simple_lock_with_context("k", &ctx)
        .expect("an unbounded wait must not fall back to the configured timeout");
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(locker.holders("k"), Some(1));

    releaser.join().unwrap();
    drop(guard);
}

#[test]
#[serial]
fn test_unbounded_context_still_cancellable() {
    let locker = fast_locker(Duration::from_millis(100));
    let _holder = locker.write_lock("k");

    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            token.cancel();
        })
    };

    let started = Instant::now();
    let ctx = LockContext::unbounded().cancelled_by(token);
    let err = locker.simple_lock_with_context("k", &ctx).unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(250));
    canceller.join().unwrap();
}

#[test]
fn test_expired_context_fails_without_holding() {
    let locker = locker();
    let ctx = LockContext::with_deadline(Instant::now());

    let err = locker.simple_lock_with_context("free", &ctx).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(locker.holders("free"), Some(0));
}

#[test]
fn test_simple_lock_excludes_blocking_writer() {
    let locker = Arc::new(locker());
    let guard = locker.simple_lock("user-3").unwrap();
    let writer_in = Arc::new(AtomicBool::new(false));

    let handle = {
        let locker = Arc::clone(&locker);
        let writer_in = Arc::clone(&writer_in);
        thread::spawn(move || {
            let _guard = locker.write_lock("user-3");
            writer_in.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!writer_in.load(Ordering::SeqCst));
    drop(guard);
    handle.join().unwrap();
    assert!(writer_in.load(Ordering::SeqCst));
}

// ============================================================================
// Sweep
// ============================================================================

#[test]
fn test_manual_sweep_keeps_held_keys() {
    let locker = locker();
    let held = locker.write_lock("held");
    locker.write_lock("idle").release();

    assert_eq!(locker.len(), 2);
    assert_eq!(locker.sweep(), 1);
    assert!(locker.contains("held"));
    assert!(!locker.contains("idle"));

    drop(held);
    assert_eq!(locker.sweep(), 1);
    assert!(locker.is_empty());
}

#[test]
fn test_sweep_after_timeout_leaves_no_state() {
    let locker = fast_locker(Duration::from_millis(50));
    let holder = locker.write_lock("k");
    locker.simple_lock("k").unwrap_err();
    drop(holder);

    assert_eq!(locker.sweep(), 1);
    assert!(locker.is_empty());
}

#[test]
fn test_lock_after_sweep_uses_fresh_entry() {
    let locker = locker();
    let old = locker.registry.get_or_create("session-1");
    locker.sweep();

    let guard = locker.write_lock("session-1");
    assert!(!Arc::ptr_eq(&old, guard.entry()));
    assert!(locker.registry.is_current("session-1", guard.entry()));
    assert_eq!(old.holders(), 0);
}

#[test]
fn test_stale_holder_finishes_on_old_entry() {
    let locker = locker();
    let entry = locker.registry.get_or_create("k");
    let stale = entry.lock().write_arc();

    // Nobody counted as a holder yet, so the sweep may take the entry.
    assert_eq!(locker.sweep(), 1);

    // The key itself is free again on a fresh entry.
    let fresh = locker.simple_lock("k").unwrap();
    assert!(!Arc::ptr_eq(&entry, fresh.entry()));

    drop(stale);
    drop(fresh);
    assert_eq!(locker.holders("k"), Some(0));
}

#[test]
#[serial]
fn test_write_lock_retries_when_entry_swept_while_waiting() {
    let locker = Arc::new(locker());
    let old = locker.registry.get_or_create("k");
    // Held outside the holder count, so the sweep treats the entry as idle.
    let raw = old.lock().write_arc();

    let waiter = {
        let locker = Arc::clone(&locker);
        thread::spawn(move || locker.write_lock("k"))
    };
    // Let the waiter look up the old entry and block on it.
    thread::sleep(Duration::from_millis(150));

    assert_eq!(locker.sweep(), 1);
    drop(raw);

    let guard = waiter.join().unwrap();
    assert!(!Arc::ptr_eq(&old, guard.entry()));
    assert!(locker.registry.is_current("k", guard.entry()));
    assert_eq!(old.holders(), 0);
    assert_eq!(locker.holders("k"), Some(1));
}

#[test]
#[serial]
fn test_simple_lock_retries_when_entry_swept_while_polling() {
    let locker = Arc::new(fast_locker(Duration::from_secs(5)));
    let old = locker.registry.get_or_create("k");
    let raw = old.lock().write_arc();

    let poller = {
        let locker = Arc::clone(&locker);
        thread::spawn(move || locker.simple_lock("k"))
    };
    thread::sleep(Duration::from_millis(150));

    assert_eq!(locker.sweep(), 1);
    drop(raw);

    let guard = poller.join().unwrap().unwrap();
    assert!(!Arc::ptr_eq(&old, guard.entry()));
    assert!(locker.registry.is_current("k", guard.entry()));
    assert_eq!(old.holders(), 0);
    assert_eq!(locker.holders("k"), Some(1));
}

#[test]
#[serial]
fn test_gc_keeps_held_entry() {
    let interval = Duration::from_millis(50);
    let locker = gc_locker(interval);

    let guard = locker.write_lock("k");
    let before = locker.registry.get("k").unwrap();
    thread::sleep(interval * 4);

    let after = locker.registry.get("k").expect("held entry was swept");
    assert!(Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&after, guard.entry()));
    assert_eq!(locker.holders("k"), Some(1));
    assert!(locker.stats().sweeps >= 1);

    drop(guard);
    assert!(wait_until(interval * 20, || locker.is_empty()));
}

#[test]
#[serial]
fn test_gc_collects_released_entries_repeatedly() {
    let interval = Duration::from_millis(50);
    let locker = gc_locker(interval);

    for _ in 0..2 {
        locker.write_lock("test1").release();
        locker.write_lock("test2").release();
        assert!(!locker.is_empty());

        assert!(
            wait_until(interval * 20, || locker.is_empty()),
            "registry still has {} entries",
            locker.len()
        );
    }
    assert!(locker.stats().collected >= 4);
}

#[test]
fn test_gc_disabled_never_sweeps() {
    let locker = locker();
    locker.write_lock("k").release();
    thread::sleep(Duration::from_millis(50));

    assert!(locker.contains("k"));
    assert_eq!(locker.stats().sweeps, 0);
    assert!(!locker.stats().gc_enabled);
    assert!(locker.gc_interval().is_none());
}

#[test]
#[serial]
fn test_gc_under_churn_preserves_exclusion() {
    const WORKERS: usize = 6;
    const ROUNDS: usize = 3_000;
    let locker = Arc::new(gc_locker(Duration::from_millis(1)));
    let inside: Arc<Vec<AtomicUsize>> = Arc::new((0..4).map(|_| AtomicUsize::new(0)).collect());

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let locker = Arc::clone(&locker);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let slot = (worker + round) % inside.len();
                    let key = format!("key-{slot}");
                    let _guard = locker.write_lock(&key);
                    assert_eq!(inside[slot].fetch_add(1, Ordering::SeqCst), 0);
                    inside[slot].fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(locker.stats().held_entries, 0);
}

// ============================================================================
// Independent lockers
// ============================================================================

#[test]
fn test_many_independent_lockers() {
    const LOCKERS: usize = 100_000;
    const WORKERS: usize = 8;

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            thread::spawn(move || {
                for _ in 0..LOCKERS / WORKERS {
                    let locker = locker();
                    locker.write_lock("test1").release();
                    locker.write_lock("test2").release();

                    assert_eq!(locker.len(), 2);
                    assert_eq!(locker.sweep(), 2);
                    assert!(locker.is_empty());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
#[serial]
fn test_independent_collectors_do_not_share_state() {
    const LOCKERS: usize = 64;
    let interval = Duration::from_millis(50);

    let lockers: Vec<_> = (0..LOCKERS).map(|_| gc_locker(interval)).collect();
    let held: Vec<_> = lockers.iter().step_by(2).map(|l| l.write_lock("test1")).collect();
    for locker in lockers.iter().skip(1).step_by(2) {
        locker.write_lock("test1").release();
    }

    assert!(wait_until(interval * 20, || {
        lockers.iter().skip(1).step_by(2).all(KeyLocker::is_empty)
    }));
    for locker in lockers.iter().step_by(2) {
        assert_eq!(locker.holders("test1"), Some(1));
    }
    drop(held);
}

// ============================================================================
// Introspection
// ============================================================================

#[test]
fn test_queries_do_not_create_entries() {
    let locker = locker();
    assert!(!locker.contains("ghost"));
    assert_eq!(locker.holders("ghost"), None);
    assert!(locker.is_empty());
}

#[test]
fn test_stats_snapshot() {
    let locker = gc_locker(Duration::from_secs(3600));
    let _a = locker.write_lock("a");
    let _b = locker.read_lock("b");
    locker.write_lock("c").release();

    let stats = locker.stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.held_entries, 2);
    assert!(stats.gc_enabled);
    assert_eq!(locker.gc_interval(), Some(Duration::from_secs(3600)));

    locker.sweep();
    let stats = locker.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.sweeps, 1);
    assert_eq!(stats.collected, 1);
    assert!(stats.last_sweep.is_some());
}

#[test]
fn test_invalid_config_rejected() {
    let config = LockerConfig {
        retry_interval_ms: 0,
        ..LockerConfig::default()
    };
    let err = KeyLocker::new(config).unwrap_err();
    assert!(matches!(err, KeylockError::ConfigError(_)));
}

#[test]
fn test_guard_debug_shows_key_and_mode() {
    let locker = locker();
    let guard = locker.read_lock("k");
    let debug = format!("{guard:?}");
    assert!(debug.contains("\"k\""));
    assert!(debug.contains("Shared"));
}
