//! # Transfer Simulator
//!
//! A concurrent bank transfer simulator: a fixed pool of accounts, several
//! worker threads, and a shared engine that moves money between randomly
//! chosen accounts under a global transaction cap.
//!
//! ## Design Principles
//!
//! - **Deadlock-free locking**: both accounts are locked in ascending id
//!   order, so no cycle of waiting can form
//! - **Bounded admission**: an atomic budget caps *successful* transfers;
//!   failed attempts refund their slot
//! - **Conservation**: the sum of all balances is invariant across any
//!   interleaving of transfers
//! - **Cooperative shutdown**: workers check a shared flag between attempts
//!   and mid-delay, never inside a critical section
//!
//! ## Example
//!
//! ```no_run
//! use transfer_sim::{simulation, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! let report = simulation::run(&config).unwrap();
//! assert!(report.is_conserved());
//! ```

pub mod account;
pub mod engine;
pub mod error;
pub mod registry;
pub mod simulation;
pub mod worker;

pub use account::Account;
pub use engine::TransferEngine;
pub use error::{Result, SimError};
pub use registry::AccountRegistry;
pub use simulation::{SimulationConfig, SimulationReport};
pub use worker::TransferWorker;
