//! Keylock CLI entry point.
//!
//! Parses arguments, sets up logging, dispatches to the command handler, and
//! maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use keylock::exit_codes;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.quiet);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// `-v`/`-q` win over `RUST_LOG`; without either, `RUST_LOG` or `warn` applies.
fn init_tracing(verbose: u8, quiet: bool) {
    let forced = match (quiet, verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("debug"),
        (false, _) => Some("trace"),
    };

    let filter = match forced {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
