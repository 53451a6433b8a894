//! Fixed account pool assembled once before any transfer activity.

use crate::account::Account;
use crate::error::{Result, SimError};
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashSet;

/// An immutable, fixed-size collection of accounts indexed `0..len()`.
///
/// The registry is built once at startup and never resized or replaced. No
/// two accounts share an id; the ids form the total order used for canonical
/// lock acquisition.
pub struct AccountRegistry {
    accounts: Vec<Account>,
}

impl AccountRegistry {
    /// Builds a registry from pre-constructed accounts.
    ///
    /// Returns [`SimError::DuplicateAccountId`] if two accounts share an id.
    pub fn new(accounts: Vec<Account>) -> Result<Self> {
        let mut seen = HashSet::new();
        for account in &accounts {
            if !seen.insert(account.id()) {
                return Err(SimError::DuplicateAccountId(account.id().to_string()));
            }
        }
        Ok(AccountRegistry { accounts })
    }

    /// Creates `count` accounts, each seeded with `initial_balance`.
    ///
    /// Ids have the shape `account-<index>-<random suffix>`; the index prefix
    /// makes them unique by construction, the suffix keeps them distinct
    /// across runs.
    pub fn with_generated_accounts(count: usize, initial_balance: i64) -> Self {
        let mut rng = rand::thread_rng();
        let accounts = (0..count)
            .map(|i| {
                let suffix: String = (&mut rng)
                    .sample_iter(Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect();
                Account::new(format!("account-{}-{}", i, suffix), initial_balance)
            })
            .collect();

        info!(
            "Created {} accounts with initial balance {}",
            count, initial_balance
        );

        AccountRegistry { accounts }
    }

    /// Number of accounts in the pool.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if the registry holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Returns the account at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    /// Iterates over all accounts in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Sum of all balances.
    ///
    /// Locks each account in turn, so the result is exact only at quiescent
    /// points. This is the oracle for the conservation check.
    pub fn total_balance(&self) -> i64 {
        self.accounts.iter().map(Account::balance).sum()
    }
}
