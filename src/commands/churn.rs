//! `keylock churn`: many short-lived keys, then a drain check.

use super::print_report;
use crate::cli::ChurnArgs;
use keylock::error::{KeylockError, Result};
use keylock::{KeyLocker, LockerConfig, LockerStats};
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub(super) struct ChurnReport {
    keys: usize,
    peak_entries: usize,
    swept_by: &'static str,
    drained: bool,
    stats: LockerStats,
}

impl fmt::Display for ChurnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Churned {} keys (peak {} entries)", self.keys, self.peak_entries)?;
        writeln!(f, "  Swept by:   {}", self.swept_by)?;
        writeln!(f, "  Sweeps:     {}", self.stats.sweeps)?;
        writeln!(f, "  Collected:  {}", self.stats.collected)?;
        write!(f, "  Remaining:  {}", self.stats.entries)
    }
}

pub(super) fn cmd_churn(config: &LockerConfig, args: ChurnArgs, json: bool) -> Result<()> {
    let report = run_churn(config, &args)?;
    print_report(&report, json)?;

    if !report.drained {
        return Err(KeylockError::RuntimeError(format!(
            "registry still holds {} entries after {} ms",
            report.stats.entries, args.wait_ms
        )));
    }
    Ok(())
}

pub(super) fn run_churn(config: &LockerConfig, args: &ChurnArgs) -> Result<ChurnReport> {
    if args.keys == 0 {
        return Err(KeylockError::UserError(
            "--keys must be greater than 0".to_string(),
        ));
    }

    let locker = KeyLocker::new(config.clone())?;
    for i in 0..args.keys {
        let key = format!("churn-{i}");
        if i % 2 == 0 {
            locker.write_lock(&key).release();
        } else {
            locker.read_lock(&key).release();
        }
    }
    let peak_entries = locker.len();

    let swept_by = if args.manual_sweep || locker.gc_interval().is_none() {
        locker.sweep();
        "manual"
    } else {
        let deadline = Instant::now() + Duration::from_millis(args.wait_ms);
        while !locker.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        "collector"
    };

    Ok(ChurnReport {
        keys: args.keys,
        peak_entries,
        swept_by,
        drained: locker.is_empty(),
        stats: locker.stats(),
    })
}
