//! Simulation driver: configuration, worker lifecycle, conservation report.
//!
//! Spawns the worker threads, waits for them with a bounded join, and
//! compares the total balance before and after the run. The conservation
//! check lives here, outside the engine, as the end-to-end correctness
//! oracle.

use crate::engine::{TransferEngine, DEFAULT_MAX_AMOUNT};
use crate::error::{Result, SimError};
use crate::registry::AccountRegistry;
use crate::worker::TransferWorker;
use log::{info, warn};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of the bounded-join poll.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Tunable simulation parameters.
///
/// The defaults mirror the classic setup: four accounts seeded with 10 000,
/// three workers, thirty transactions, amounts up to 1000, pacing delays of
/// one to two seconds, and a five-minute join timeout. None of these are
/// protocol requirements.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of accounts in the pool.
    pub accounts: usize,
    /// Number of worker threads.
    pub workers: usize,
    /// Global cap on completed transfers.
    pub max_transactions: usize,
    /// Starting balance of every account.
    pub initial_balance: i64,
    /// Upper bound for randomly drawn transfer amounts.
    pub max_amount: i64,
    /// Lower bound of the worker pacing delay, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the worker pacing delay, in milliseconds. Zero
    /// disables pacing entirely.
    pub max_delay_ms: u64,
    /// How long to wait for workers before forcing shutdown.
    pub join_timeout: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            accounts: 4,
            workers: 3,
            max_transactions: 30,
            initial_balance: 10_000,
            max_amount: DEFAULT_MAX_AMOUNT,
            min_delay_ms: 1_000,
            max_delay_ms: 2_000,
            join_timeout: Duration::from_secs(300),
        }
    }
}

/// Outcome of a completed simulation run.
#[derive(Debug)]
pub struct SimulationReport {
    /// Sum of balances before any transfer activity.
    pub initial_total: i64,
    /// Sum of balances after all workers finished.
    pub final_total: i64,
    /// Transfers actually completed.
    pub transactions: usize,
    /// The configured cap.
    pub max_transactions: usize,
    /// Closing balance per account, in registry order.
    pub balances: Vec<(String, i64)>,
}

impl SimulationReport {
    /// Returns `true` if the total balance survived the run unchanged.
    pub fn is_conserved(&self) -> bool {
        self.initial_total == self.final_total
    }

    /// Writes a human-readable summary of the run.
    pub fn write_summary<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(
            writer,
            "transactions: {} / {}",
            self.transactions, self.max_transactions
        )?;
        writeln!(writer, "initial total: {}", self.initial_total)?;
        writeln!(writer, "final total: {}", self.final_total)?;
        for (id, balance) in &self.balances {
            writeln!(writer, "{}: {}", id, balance)?;
        }
        if self.is_conserved() {
            writeln!(writer, "result: total balance conserved")?;
        } else {
            writeln!(
                writer,
                "result: MISMATCH (initial {}, final {})",
                self.initial_total, self.final_total
            )?;
        }
        Ok(())
    }
}

/// Runs one complete simulation: build the pool, spawn workers, join with a
/// deadline, and report.
///
/// Returns [`SimError::NoWorkers`] for a zero worker count and
/// [`SimError::WorkerPanicked`] if any worker thread panicked; both are
/// programmer errors, not expected outcomes.
pub fn run(config: &SimulationConfig) -> Result<SimulationReport> {
    if config.workers == 0 {
        return Err(SimError::NoWorkers);
    }

    let registry = Arc::new(AccountRegistry::with_generated_accounts(
        config.accounts,
        config.initial_balance,
    ));
    let initial_total = registry.total_balance();
    info!("initial total: {}", initial_total);

    let engine = Arc::new(TransferEngine::with_max_amount(
        Arc::clone(&registry),
        config.max_transactions,
        config.max_amount,
    )?);
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::with_capacity(config.workers);
    for id in 0..config.workers {
        let worker = TransferWorker::new(
            id,
            Arc::clone(&engine),
            Arc::clone(&shutdown),
            config.min_delay_ms,
            config.max_delay_ms,
        );
        let handle = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker.run())?;
        handles.push(handle);
    }

    let deadline = Instant::now() + config.join_timeout;
    while handles.iter().any(|handle| !handle.is_finished()) {
        if Instant::now() >= deadline {
            warn!("join timeout expired, signalling shutdown to remaining workers");
            break;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }
    shutdown.store(true, Ordering::Release);

    for (id, handle) in handles.into_iter().enumerate() {
        handle.join().map_err(|_| SimError::WorkerPanicked(id))?;
    }

    let final_total = registry.total_balance();
    info!(
        "final total: {}, transactions performed: {}",
        final_total,
        engine.success_count()
    );

    Ok(SimulationReport {
        initial_total,
        final_total,
        transactions: engine.success_count(),
        max_transactions: config.max_transactions,
        balances: registry
            .iter()
            .map(|account| (account.id().to_string(), account.balance()))
            .collect(),
    })
}
