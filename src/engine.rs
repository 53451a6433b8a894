//! Core transfer engine.
//!
//! Mediates all cross-account mutation: workers never touch accounts
//! directly. Each attempt reserves a unit of the transaction budget, locks
//! the two accounts in canonical id order, and moves money atomically. The
//! budget bounds *successful* transfers; a failed attempt refunds its slot.

use crate::account::Account;
use crate::error::{Result, SimError};
use crate::registry::AccountRegistry;
use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, MutexGuard};

/// Default upper bound for randomly drawn transfer amounts.
pub const DEFAULT_MAX_AMOUNT: i64 = 1000;

/// Reserved admission slot, refunded on drop unless committed.
///
/// Holding this guard across the critical section guarantees the slot is
/// returned on every failure path, including an unexpected unwind.
struct SlotGuard<'a> {
    budget: &'a AtomicUsize,
    committed: bool,
}

impl SlotGuard<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.budget.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// The transfer engine.
///
/// Shared by all workers; every method is safe to call concurrently. The
/// engine keeps two atomic counters: the number of completed transfers and
/// the remaining admission budget. At any instant,
/// `slots held + successes + remaining budget == max_transactions`.
///
/// # Deadlock freedom
///
/// The two selected accounts are always locked in ascending id order,
/// regardless of which is the source. Because the order is a system-wide
/// total order independent of transfer direction, no cycle of waiting can
/// form among concurrent attempts.
pub struct TransferEngine {
    registry: Arc<AccountRegistry>,
    max_transactions: usize,
    max_amount: i64,
    success_count: AtomicUsize,
    available_slots: AtomicUsize,
}

impl TransferEngine {
    /// Creates an engine with the default amount bound of
    /// [`DEFAULT_MAX_AMOUNT`].
    pub fn new(registry: Arc<AccountRegistry>, max_transactions: usize) -> Self {
        TransferEngine {
            registry,
            max_transactions,
            max_amount: DEFAULT_MAX_AMOUNT,
            success_count: AtomicUsize::new(0),
            available_slots: AtomicUsize::new(max_transactions),
        }
    }

    /// Creates an engine with a custom amount bound.
    ///
    /// Returns [`SimError::InvalidAmountBound`] if `max_amount < 1`; random
    /// amounts are drawn from `1..=max_amount`.
    pub fn with_max_amount(
        registry: Arc<AccountRegistry>,
        max_transactions: usize,
        max_amount: i64,
    ) -> Result<Self> {
        if max_amount < 1 {
            return Err(SimError::InvalidAmountBound);
        }
        let mut engine = Self::new(registry, max_transactions);
        engine.max_amount = max_amount;
        Ok(engine)
    }

    /// Attempts one transfer between two distinct accounts chosen uniformly
    /// at random, with an amount drawn from `1..=max_amount`.
    ///
    /// Returns `true` only if money actually moved. Expected failures
    /// (budget exhausted, insufficient funds, fewer than two accounts) are
    /// `false`, never errors.
    pub fn attempt_transfer<R: Rng>(&self, rng: &mut R) -> bool {
        if !self.can_attempt() {
            return false;
        }

        let len = self.registry.len();
        let from_index = rng.gen_range(0..len);
        // Draw from the remaining indices so the pair is distinct and uniform.
        let mut to_index = rng.gen_range(0..len - 1);
        if to_index >= from_index {
            to_index += 1;
        }
        let amount = rng.gen_range(1..=self.max_amount);

        self.transfer(from_index, to_index, amount)
    }

    /// Moves `amount` from the account at `from_index` to the account at
    /// `to_index`, subject to the admission budget and available funds.
    ///
    /// This is the deterministic entry point behind [`attempt_transfer`];
    /// tests use it to reproduce exact scenarios.
    ///
    /// [`attempt_transfer`]: TransferEngine::attempt_transfer
    pub fn transfer(&self, from_index: usize, to_index: usize, amount: i64) -> bool {
        // Static preconditions fail before anything is reserved.
        if from_index == to_index || amount <= 0 {
            return false;
        }
        let (Some(from), Some(to)) = (self.registry.get(from_index), self.registry.get(to_index))
        else {
            return false;
        };

        let Some(slot) = self.acquire_slot() else {
            debug!(
                "transfer rejected: budget exhausted ({} transactions completed)",
                self.success_count()
            );
            return false;
        };

        // Critical section: balance comparison and adjustment only.
        let outcome = {
            let (mut from_balance, mut to_balance) = Self::lock_pair(from, to);
            match (
                from_balance.checked_sub(amount),
                to_balance.checked_add(amount),
            ) {
                (Some(new_from), Some(new_to)) if new_from >= 0 => {
                    *from_balance = new_from;
                    *to_balance = new_to;
                    Some((new_from, new_to))
                }
                _ => None,
            }
        };

        match outcome {
            Some((from_after, to_after)) => {
                let completed = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                slot.commit();
                info!(
                    "TRANSFER-{} SUCCESS: {} -> {}, amount: {}, balances now: {} / {}",
                    completed,
                    from.id(),
                    to.id(),
                    amount,
                    from_after,
                    to_after
                );
                true
            }
            None => {
                debug!(
                    "TRANSFER FAILED: insufficient funds, {} -> {}, requested: {}",
                    from.id(),
                    to.id(),
                    amount
                );
                // slot refunds on drop
                false
            }
        }
    }

    /// Number of completed transfers so far.
    pub fn success_count(&self) -> usize {
        self.success_count.load(Ordering::Acquire)
    }

    /// Configured transaction maximum.
    pub fn max_transactions(&self) -> usize {
        self.max_transactions
    }

    /// Remaining admission budget.
    ///
    /// At quiescent points `remaining_capacity() + success_count()` equals
    /// `max_transactions()`.
    pub fn remaining_capacity(&self) -> usize {
        self.available_slots.load(Ordering::Acquire)
    }

    /// Returns `true` once the transaction maximum has been reached.
    pub fn reached_limit(&self) -> bool {
        self.success_count() >= self.max_transactions
    }

    /// Returns `true` iff the registry holds at least two accounts.
    pub fn can_attempt(&self) -> bool {
        self.registry.len() >= 2
    }

    /// The account pool this engine operates on.
    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Non-blocking reservation of one budget unit.
    fn acquire_slot(&self) -> Option<SlotGuard<'_>> {
        self.available_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |slots| {
                slots.checked_sub(1)
            })
            .ok()
            .map(|_| SlotGuard {
                budget: &self.available_slots,
                committed: false,
            })
    }

    /// Locks both accounts, smaller id first, and returns the guards as
    /// `(source, destination)` regardless of acquisition order.
    fn lock_pair<'a>(
        from: &'a Account,
        to: &'a Account,
    ) -> (MutexGuard<'a, i64>, MutexGuard<'a, i64>) {
        if from.id() < to.id() {
            let from_balance = from.lock_balance();
            let to_balance = to.lock_balance();
            (from_balance, to_balance)
        } else {
            let to_balance = to.lock_balance();
            let from_balance = from.lock_balance();
            (from_balance, to_balance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::thread;

    fn engine_with_balances(balances: &[i64], max_transactions: usize) -> TransferEngine {
        let accounts = balances
            .iter()
            .enumerate()
            .map(|(i, &b)| Account::new(format!("account-{}", i), b))
            .collect();
        let registry = Arc::new(AccountRegistry::new(accounts).unwrap());
        TransferEngine::new(registry, max_transactions)
    }

    #[test]
    fn test_single_transfer_moves_money_and_counts() {
        let engine = engine_with_balances(&[100, 100], 1);

        assert!(engine.transfer(0, 1, 50));
        assert_eq!(engine.registry().get(0).unwrap().balance(), 50);
        assert_eq!(engine.registry().get(1).unwrap().balance(), 150);
        assert_eq!(engine.success_count(), 1);
        assert!(engine.reached_limit());

        // Limit reached: the second attempt must not move anything.
        assert!(!engine.transfer(0, 1, 10));
        assert_eq!(engine.registry().get(0).unwrap().balance(), 50);
        assert_eq!(engine.registry().get(1).unwrap().balance(), 150);
        assert_eq!(engine.success_count(), 1);
    }

    #[test]
    fn test_insufficient_funds_refunds_the_slot() {
        let engine = engine_with_balances(&[0, 100], 5);

        for _ in 0..10 {
            assert!(!engine.transfer(0, 1, 25));
        }

        assert_eq!(engine.registry().get(0).unwrap().balance(), 0);
        assert_eq!(engine.registry().get(1).unwrap().balance(), 100);
        assert_eq!(engine.registry().total_balance(), 100);
        assert_eq!(engine.success_count(), 0);
        assert_eq!(engine.remaining_capacity(), 5);
    }

    #[test]
    fn test_slot_accounting_mixes_successes_and_failures() {
        let engine = engine_with_balances(&[30, 0], 5);

        // 30 units cover exactly three transfers of 10.
        let mut successes = 0;
        for _ in 0..8 {
            if engine.transfer(0, 1, 10) {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(engine.success_count(), 3);
        assert_eq!(
            engine.remaining_capacity() + engine.success_count(),
            engine.max_transactions()
        );
        assert_eq!(engine.registry().total_balance(), 30);
    }

    #[test]
    fn test_preconditions_fail_without_reserving() {
        let engine = engine_with_balances(&[100, 100], 3);

        assert!(!engine.transfer(0, 0, 10)); // same account
        assert!(!engine.transfer(0, 1, 0)); // non-positive amount
        assert!(!engine.transfer(0, 1, -5));
        assert!(!engine.transfer(0, 9, 10)); // out of range
        assert!(!engine.transfer(9, 1, 10));

        assert_eq!(engine.remaining_capacity(), 3);
        assert_eq!(engine.success_count(), 0);
        assert_eq!(engine.registry().total_balance(), 200);
    }

    #[test]
    fn test_fewer_than_two_accounts_never_attempts() {
        let engine = engine_with_balances(&[100], 3);
        let mut rng = StdRng::seed_from_u64(7);

        assert!(!engine.can_attempt());
        assert!(!engine.attempt_transfer(&mut rng));
        assert_eq!(engine.remaining_capacity(), 3);
        assert_eq!(engine.registry().total_balance(), 100);
    }

    #[test]
    fn test_zero_transaction_maximum_rejects_everything() {
        let engine = engine_with_balances(&[100, 100], 0);

        assert!(engine.reached_limit());
        assert!(!engine.transfer(0, 1, 10));
        assert_eq!(engine.registry().total_balance(), 200);
    }

    #[test]
    fn test_amount_bound_must_be_positive() {
        let registry = Arc::new(
            AccountRegistry::new(vec![Account::new("a", 10), Account::new("b", 10)]).unwrap(),
        );
        assert!(TransferEngine::with_max_amount(Arc::clone(&registry), 5, 0).is_err());
        assert!(TransferEngine::with_max_amount(registry, 5, 1).is_ok());
    }

    #[test]
    fn test_seeded_attempts_conserve_total() {
        let engine = engine_with_balances(&[500, 500, 500], 20);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            engine.attempt_transfer(&mut rng);
        }

        assert_eq!(engine.registry().total_balance(), 1500);
        assert!(engine.success_count() <= 20);
        assert_eq!(
            engine.remaining_capacity() + engine.success_count(),
            engine.max_transactions()
        );
    }

    #[test]
    fn test_concurrent_stress_conserves_and_terminates() {
        const WORKERS: usize = 8;
        const MAX_TRANSACTIONS: usize = 200;

        let engine = Arc::new(engine_with_balances(
            &[10_000, 10_000, 10_000, 10_000],
            MAX_TRANSACTIONS,
        ));

        let handles: Vec<_> = (0..WORKERS)
            .map(|seed| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed as u64);
                    let mut attempts = 0;
                    while !engine.reached_limit() && attempts < 5_000 {
                        engine.attempt_transfer(&mut rng);
                        attempts += 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.registry().total_balance(), 40_000);
        assert!(engine.success_count() <= MAX_TRANSACTIONS);
        assert_eq!(
            engine.remaining_capacity() + engine.success_count(),
            engine.max_transactions()
        );
        for account in engine.registry().iter() {
            assert!(account.balance() >= 0, "negative balance on {}", account.id());
        }
    }
}
