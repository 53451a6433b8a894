//! Error types for the transfer simulator.
//!
//! Expected transfer outcomes (budget exhausted, insufficient funds, too few
//! accounts) are reported as booleans, never as errors. This enum covers
//! construction preconditions, driver faults, and the conservation check.

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while building or driving the simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// Two accounts were registered with the same id
    #[error("duplicate account id: {0}")]
    DuplicateAccountId(String),

    /// The transfer amount bound must allow at least one unit
    #[error("maximum transfer amount must be at least 1")]
    InvalidAmountBound,

    /// The simulation needs at least one worker
    #[error("at least one worker is required")]
    NoWorkers,

    /// A command-line argument failed to parse
    #[error("invalid value for {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    /// Failed to spawn a worker thread
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker thread panicked mid-run
    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),

    /// The conservation check failed after the run quiesced
    #[error("total balance mismatch: initial {initial}, final {final_total}")]
    BalanceMismatch { initial: i64, final_total: i64 },
}
