//! Worker loop driving transfer attempts.
//!
//! Each worker repeatedly asks the shared engine for one transfer, pacing
//! itself with a bounded random delay. Workers share no state beyond the
//! engine and the shutdown flag; cancellation is cooperative and is observed
//! between attempts and mid-delay, never inside a critical section.

use crate::engine::TransferEngine;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which a pacing delay re-checks the shutdown flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single transfer worker.
pub struct TransferWorker {
    id: usize,
    engine: Arc<TransferEngine>,
    shutdown: Arc<AtomicBool>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl TransferWorker {
    /// Creates a worker pacing itself with delays drawn from
    /// `min_delay_ms..=max_delay_ms` (a zero `max_delay_ms` disables pacing).
    pub fn new(
        id: usize,
        engine: Arc<TransferEngine>,
        shutdown: Arc<AtomicBool>,
        min_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        TransferWorker {
            id,
            engine,
            shutdown,
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms,
        }
    }

    /// Runs the worker loop until the limit is reached, transfers become
    /// structurally impossible, or shutdown is signalled.
    ///
    /// No lock or admission slot is held while pacing, so stopping at any
    /// loop check can never leak either.
    pub fn run(&self) {
        info!("worker {} started", self.id);
        let mut rng = rand::thread_rng();

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                debug!("worker {} observed shutdown, stopping", self.id);
                break;
            }
            if self.engine.reached_limit() {
                debug!(
                    "worker {} stopping: transaction limit of {} reached",
                    self.id,
                    self.engine.max_transactions()
                );
                break;
            }
            if !self.engine.can_attempt() {
                warn!("worker {} stopping: not enough accounts for a transfer", self.id);
                break;
            }

            if !self.pace(&mut rng) {
                debug!("worker {} cancelled mid-delay, stopping", self.id);
                break;
            }

            if self.engine.attempt_transfer(&mut rng) {
                debug!("worker {} completed a transfer", self.id);
            } else {
                debug!("worker {} attempt was rejected", self.id);
            }
        }

        info!("worker {} finished", self.id);
    }

    /// Sleeps for a random bounded delay, returning `false` if shutdown was
    /// signalled before the delay elapsed.
    fn pace<R: Rng>(&self, rng: &mut R) -> bool {
        if self.max_delay_ms == 0 {
            return true;
        }

        let delay = Duration::from_millis(rng.gen_range(self.min_delay_ms..=self.max_delay_ms));
        let deadline = Instant::now() + delay;

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL.min(deadline - now));
        }
    }
}
