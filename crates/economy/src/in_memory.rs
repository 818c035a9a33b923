use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use coffer_core::{LedgerError, LedgerResult, WorldId};

use crate::ledger::EconomyLedger;

/// In-memory ledger keyed by account name.
///
/// Intended for tests/dev. Balances never go below zero: a subtraction that
/// would overdraw an entry is refused, as most economy backends do.
#[derive(Debug)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<String, f64>>,
    available: AtomicBool,
    currency_symbol: String,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            currency_symbol: "$".to_string(),
        }
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Simulate the backend going away (`false`) or coming back (`true`).
    ///
    /// While unavailable every read fails and every mutation reports `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of open entries.
    pub fn len(&self) -> usize {
        self.balances.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> LedgerResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(LedgerError::unavailable("in-memory ledger is offline"))
        }
    }

    /// Apply `f` to the existing entry for `name`; `false` if anything is off.
    fn mutate(&self, name: &str, world: WorldId, f: impl FnOnce(f64) -> Option<f64>) -> bool {
        if let Err(err) = self.ensure_available() {
            tracing::warn!(account = %name, %world, %err, "ledger mutation refused");
            return false;
        }

        let Ok(mut balances) = self.balances.write() else {
            tracing::error!(account = %name, "ledger lock poisoned");
            return false;
        };

        let Some(current) = balances.get_mut(name) else {
            tracing::debug!(account = %name, %world, "mutation on unknown account");
            return false;
        };

        match f(*current) {
            Some(next) if next.is_finite() && next >= 0.0 => {
                tracing::trace!(account = %name, %world, from = *current, to = next, "balance updated");
                *current = next;
                true
            }
            _ => false,
        }
    }
}

impl EconomyLedger for InMemoryLedger {
    fn balance(&self, name: &str, _world: WorldId) -> LedgerResult<f64> {
        self.ensure_available()?;

        let balances = self
            .balances
            .read()
            .map_err(|_| LedgerError::unavailable("lock poisoned"))?;

        balances
            .get(name)
            .copied()
            .ok_or_else(|| LedgerError::unknown_account(name))
    }

    fn set_balance(&self, name: &str, amount: f64, world: WorldId) -> bool {
        self.mutate(name, world, |_| Some(amount))
    }

    fn add(&self, name: &str, amount: f64, world: WorldId) -> bool {
        self.mutate(name, world, |current| Some(current + amount))
    }

    fn subtract(&self, name: &str, amount: f64, world: WorldId) -> bool {
        self.mutate(name, world, |current| {
            if amount > current {
                None
            } else {
                Some(current - amount)
            }
        })
    }

    fn format_balance(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, amount)
    }

    fn has_account(&self, name: &str) -> bool {
        self.is_available()
            && self
                .balances
                .read()
                .map(|b| b.contains_key(name))
                .unwrap_or(false)
    }

    fn create_account(&self, name: &str, world: WorldId) -> bool {
        if let Err(err) = self.ensure_available() {
            tracing::warn!(account = %name, %world, %err, "cannot open account");
            return false;
        }

        let Ok(mut balances) = self.balances.write() else {
            tracing::error!(account = %name, "ledger lock poisoned");
            return false;
        };

        balances.entry(name.to_string()).or_insert(0.0);
        true
    }

    fn remove_account(&self, name: &str) {
        if let Err(err) = self.ensure_available() {
            tracing::warn!(account = %name, %err, "cannot remove account");
            return;
        }

        if let Ok(mut balances) = self.balances.write() {
            balances.remove(name);
        }
    }
}
