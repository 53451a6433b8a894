//! Transfer Simulator CLI
//!
//! Runs a concurrent transfer simulation and prints a conservation report.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- [accounts] [workers] [max-transactions] [max-delay-ms]
//! ```
//!
//! All arguments are optional and default to the classic setup of four
//! accounts, three workers, thirty transactions, and delays up to two
//! seconds. The process exits non-zero if the conservation check fails.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` to control logging verbosity

use std::env;
use std::io;
use std::process;
use std::str::FromStr;
use transfer_sim::{simulation, Result, SimError, SimulationConfig};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut config = SimulationConfig::default();

    if let Some(accounts) = parse_arg(&args, 1, "accounts")? {
        config.accounts = accounts;
    }
    if let Some(workers) = parse_arg(&args, 2, "workers")? {
        config.workers = workers;
    }
    if let Some(max_transactions) = parse_arg(&args, 3, "max-transactions")? {
        config.max_transactions = max_transactions;
    }
    if let Some(max_delay_ms) = parse_arg::<u64>(&args, 4, "max-delay-ms")? {
        config.max_delay_ms = max_delay_ms;
        config.min_delay_ms = max_delay_ms / 2;
    }

    let report = simulation::run(&config)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    report.write_summary(handle)?;

    if !report.is_conserved() {
        return Err(SimError::BalanceMismatch {
            initial: report.initial_total,
            final_total: report.final_total,
        });
    }

    Ok(())
}

/// Parses the positional argument at `index`, if present.
fn parse_arg<T: FromStr>(args: &[String], index: usize, name: &'static str) -> Result<Option<T>> {
    match args.get(index) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| SimError::InvalidArgument {
                name,
                value: raw.clone(),
            }),
        None => Ok(None),
    }
}
