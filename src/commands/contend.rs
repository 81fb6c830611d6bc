//! `keylock contend`: a bounded-retry lock against a held key.

use super::print_report;
use crate::cli::ContendArgs;
use keylock::error::{KeylockError, Result};
use keylock::{KeyLocker, LockContext, LockerConfig};
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub(super) struct ContendReport {
    key: String,
    acquired: bool,
    waited_ms: u64,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    hold_ms: Option<u64>,
}

impl fmt::Display for ContendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.acquired { "acquired" } else { "timed out" };
        write!(
            f,
            "'{}' {} after {} ms (deadline {} ms)",
            self.key, outcome, self.waited_ms, self.timeout_ms
        )
    }
}

pub(super) fn cmd_contend(config: &LockerConfig, args: ContendArgs, json: bool) -> Result<()> {
    let (report, outcome) = run_contend(config, &args)?;
    print_report(&report, json)?;
    outcome
}

/// Returns the report plus the attempt's own outcome, so a timeout still
/// gets reported before it becomes the exit status.
pub(super) fn run_contend(
    config: &LockerConfig,
    args: &ContendArgs,
) -> Result<(ContendReport, Result<()>)> {
    let locker = KeyLocker::new(config.clone())?;
    let mut holder = Some(locker.write_lock(&args.key));

    let releaser = args.hold_ms.map(|ms| {
        let guard = holder.take();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            drop(guard);
        })
    });

    let started = Instant::now();
    let ctx = LockContext::with_timeout(Duration::from_millis(args.timeout_ms));
    let attempt = locker.simple_lock_with_context(&args.key, &ctx);
    let waited = started.elapsed();

    if let Some(releaser) = releaser {
        releaser
            .join()
            .map_err(|_| KeylockError::RuntimeError("releaser thread panicked".to_string()))?;
    }
    drop(holder);

    let report = ContendReport {
        key: args.key.clone(),
        acquired: attempt.is_ok(),
        waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        timeout_ms: args.timeout_ms,
        hold_ms: args.hold_ms,
    };
    Ok((report, attempt.map(|guard| guard.release())))
}
