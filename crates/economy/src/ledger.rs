//! External ledger interface.
//!
//! Balances are never stored by accounts; every read and write goes through an
//! [`EconomyLedger`] keyed by account name. The world token is passed through
//! unchanged.

use coffer_core::{LedgerResult, WorldId};

/// Balance store the accounts delegate to.
///
/// Implementations decide where balances live (a plugin economy, a database,
/// memory). Mutations report success as a flag; only reads carry an error,
/// matching what typical economy backends expose.
pub trait EconomyLedger: Send + Sync {
    /// Current balance of `name`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownAccount` if no entry exists and
    /// `LedgerError::Unavailable` if the backend cannot be reached.
    fn balance(&self, name: &str, world: WorldId) -> LedgerResult<f64>;

    /// Overwrite the balance of `name`.
    fn set_balance(&self, name: &str, amount: f64, world: WorldId) -> bool;

    /// Add `amount` to the balance of `name`.
    fn add(&self, name: &str, amount: f64, world: WorldId) -> bool;

    /// Subtract `amount` from the balance of `name`.
    fn subtract(&self, name: &str, amount: f64, world: WorldId) -> bool;

    /// Render an amount for display (currency symbol, precision).
    fn format_balance(&self, amount: f64) -> String;

    /// Whether an entry exists under `name`.
    fn has_account(&self, name: &str) -> bool;

    /// Open an entry for `name` with a zero balance.
    ///
    /// Opening an existing entry leaves it untouched and succeeds.
    fn create_account(&self, name: &str, world: WorldId) -> bool;

    /// Delete the entry for `name`. Unknown names are ignored.
    fn remove_account(&self, name: &str);
}
