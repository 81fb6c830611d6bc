//! Command implementations for keylock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the config loading and report printing they share.

mod churn;
mod contend;
mod stress;

use crate::cli::{Cli, Command};
use keylock::LockerConfig;
use keylock::error::{KeylockError, Result};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. The configuration
/// is loaded once and handed to every command.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Stress(args) => stress::cmd_stress(&config, args, cli.json),
        Command::Contend(args) => contend::cmd_contend(&config, args, cli.json),
        Command::Churn(args) => churn::cmd_churn(&config, args, cli.json),
        Command::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<LockerConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            LockerConfig::load(path)
        }
        None => Ok(LockerConfig::default()),
    }
}

fn cmd_config(config: &LockerConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

/// Print a report as text, or as pretty JSON when `json` is set.
fn print_report<T: Serialize + Display>(report: &T, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).map_err(|e| {
            KeylockError::RuntimeError(format!("failed to serialize report: {}", e))
        })?;
        println!("{}", out);
    } else {
        println!("{}", report);
    }
    Ok(())
}
