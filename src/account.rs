//! Bank account model.
//!
//! An account is an identity-bearing balance cell. The balance is guarded by
//! the account's own mutex, which is only ever acquired through the transfer
//! engine's canonical-order locking routine.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single bank account.
///
/// # Identity
///
/// Accounts are equal iff their ids are equal; the balance never participates
/// in equality or hashing. The id is stable for the account's lifetime and
/// doubles as the total-order key for deadlock-free lock acquisition.
///
/// # Locking
///
/// The balance may only be read or written while holding the account's mutex.
/// Raw lock access is crate-private so callers outside the engine cannot
/// bypass the canonical lock order.
pub struct Account {
    id: String,
    balance: Mutex<i64>,
}

impl Account {
    /// Creates an account with the given id and initial balance.
    pub fn new(id: impl Into<String>, initial_balance: i64) -> Self {
        Account {
            id: id.into(),
            balance: Mutex::new(initial_balance),
        }
    }

    /// Returns the account's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a snapshot of the current balance.
    ///
    /// Takes the account lock for the duration of the read. The value is only
    /// exact at quiescent points (no transfer in flight); mid-run it is a
    /// momentary observation.
    pub fn balance(&self) -> i64 {
        *self.lock_balance()
    }

    /// Locks the balance for mutation.
    ///
    /// The critical section performs no panicking operations, so a poisoned
    /// mutex can never expose a half-applied transfer; recovering the inner
    /// value is safe.
    pub(crate) fn lock_balance(&self) -> MutexGuard<'_, i64> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("balance", &self.balance())
            .finish()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account[id = {}, balance = {}]", self.id, self.balance())
    }
}
