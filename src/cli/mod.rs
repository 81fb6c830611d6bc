//! CLI argument parsing for keylock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

/// Keylock: drive an in-process keyed lock manager.
///
/// Each command builds a fresh lock manager from the configuration and
/// exercises it from several threads:
/// - `stress` hammers one key with many workers
/// - `contend` shows the bounded-retry lock giving up on a held key
/// - `churn` creates many keys and checks the sweep drains them
#[derive(Parser, Debug)]
#[command(name = "keylock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML config file (defaults apply when omitted).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for keylock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run many acquire/release cycles on one key from several workers.
    ///
    /// Reports throughput, bounded-retry timeouts and the registry size
    /// left behind.
    Stress(StressArgs),

    /// Hold a key, then try a bounded-retry lock on it.
    ///
    /// Exits with the lock-timeout code when the attempt gives up.
    Contend(ContendArgs),

    /// Lock and release many distinct keys, then wait for the sweep.
    ///
    /// Fails if the registry does not drain.
    Churn(ChurnArgs),

    /// Print the effective configuration as YAML.
    Config,
}

/// Which acquisition the stress workers use.
#[derive(ValueEnum, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StressMode {
    /// Blocking shared lock.
    Read,
    /// Blocking exclusive lock.
    Write,
    /// Bounded-retry exclusive lock.
    Simple,
}

/// Arguments for the `stress` command.
#[derive(Parser, Debug)]
pub struct StressArgs {
    /// Number of worker threads.
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// Total acquire/release cycles across all workers.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub iterations: usize,

    /// Acquisition style.
    #[arg(short, long, value_enum, default_value_t = StressMode::Read)]
    pub mode: StressMode,

    /// Key every worker locks.
    #[arg(short, long, default_value = "stress")]
    pub key: String,
}

/// Arguments for the `contend` command.
#[derive(Parser, Debug)]
pub struct ContendArgs {
    /// Key to contend on.
    #[arg(short, long, default_value = "contended")]
    pub key: String,

    /// Deadline for the bounded-retry attempt, in milliseconds.
    #[arg(short, long, default_value_t = 1_000)]
    pub timeout_ms: u64,

    /// Release the held key after this many milliseconds (never, if omitted).
    #[arg(long)]
    pub hold_ms: Option<u64>,
}

/// Arguments for the `churn` command.
#[derive(Parser, Debug)]
pub struct ChurnArgs {
    /// Number of distinct keys to create.
    #[arg(short, long, default_value_t = 1_000)]
    pub keys: usize,

    /// Run one sweep directly instead of waiting for the collector.
    #[arg(long)]
    pub manual_sweep: bool,

    /// How long to wait for the collector to drain the registry.
    #[arg(long, default_value_t = 5_000)]
    pub wait_ms: u64,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
