//! `keylock stress`: many workers, one key.

use super::print_report;
use crate::cli::{StressArgs, StressMode};
use keylock::error::{KeylockError, Result};
use keylock::{KeyLocker, LockerConfig};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub(super) struct StressReport {
    mode: StressMode,
    key: String,
    workers: usize,
    iterations: usize,
    timeouts: usize,
    elapsed_ms: u64,
    ops_per_sec: f64,
    entries_after: usize,
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stress run on '{}' ({:?} locks)", self.key, self.mode)?;
        writeln!(f, "  Workers:     {}", self.workers)?;
        writeln!(f, "  Iterations:  {}", self.iterations)?;
        writeln!(f, "  Timeouts:    {}", self.timeouts)?;
        writeln!(f, "  Elapsed:     {} ms", self.elapsed_ms)?;
        writeln!(f, "  Throughput:  {:.0} ops/s", self.ops_per_sec)?;
        write!(f, "  Entries:     {}", self.entries_after)
    }
}

pub(super) fn cmd_stress(config: &LockerConfig, args: StressArgs, json: bool) -> Result<()> {
    let report = run_stress(config, &args)?;
    print_report(&report, json)
}

pub(super) fn run_stress(config: &LockerConfig, args: &StressArgs) -> Result<StressReport> {
    if args.workers == 0 {
        return Err(KeylockError::UserError(
            "--workers must be greater than 0".to_string(),
        ));
    }

    let locker = KeyLocker::new(config.clone())?;
    let timeouts = AtomicUsize::new(0);
    let started = Instant::now();

    thread::scope(|scope| {
        for worker in 0..args.workers {
            // Spread the remainder over the first workers.
            let share = args.iterations / args.workers
                + usize::from(worker < args.iterations % args.workers);
            let locker = &locker;
            let timeouts = &timeouts;
            scope.spawn(move || {
                for _ in 0..share {
                    match args.mode {
                        StressMode::Read => locker.read_lock(&args.key).release(),
                        StressMode::Write => locker.write_lock(&args.key).release(),
                        StressMode::Simple => match locker.simple_lock(&args.key) {
                            Ok(guard) => guard.release(),
                            Err(_) => {
                                timeouts.fetch_add(1, Ordering::Relaxed);
                            }
                        },
                    }
                }
            });
        }
    });

    let elapsed = started.elapsed();
    let timeouts = timeouts.into_inner();
    tracing::debug!(?elapsed, timeouts, "stress run finished");

    Ok(StressReport {
        mode: args.mode,
        key: args.key.clone(),
        workers: args.workers,
        iterations: args.iterations,
        timeouts,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        ops_per_sec: args.iterations as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        entries_after: locker.len(),
    })
}
