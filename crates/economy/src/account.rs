//! Ledger-backed accounts.
//!
//! An [`Account`] stores nothing but its name and world; every balance lives in
//! the [`EconomyLedger`]. The trait carries the default deposit/withdraw
//! algorithm, and implementations change behaviour by overriding the
//! `add_money`/`subtract_money` hooks.

use std::sync::Arc;

use coffer_core::{AccountError, AccountResult, WorldId, ensure_positive};

use crate::ledger::EconomyLedger;

/// Shown in place of a balance when the ledger cannot report one.
pub const FORMAT_ERROR: &str = "Error";

/// Common account contract.
pub trait Account {
    /// Ledger key for this account.
    fn name(&self) -> &str;

    /// Context token handed to every ledger call.
    fn world(&self) -> WorldId;

    fn ledger(&self) -> &dyn EconomyLedger;

    /// Credit hook used by [`Account::deposit`]. `amount` is already validated.
    fn add_money(&self, amount: f64) -> bool {
        self.ledger().add(self.name(), amount, self.world())
    }

    /// Debit hook used by [`Account::withdraw`]. `amount` is already validated.
    fn subtract_money(&self, amount: f64) -> bool {
        self.ledger().subtract(self.name(), amount, self.world())
    }

    /// Add `amount` to this account.
    ///
    /// Returns `false` for non-positive amounts or when the ledger refuses.
    fn deposit(&self, amount: f64, reason: Option<&str>) -> bool {
        let span = tracing::debug_span!(
            "deposit",
            account = %self.name(),
            amount,
            reason = reason.unwrap_or_default()
        );
        let _guard = span.enter();

        match ensure_positive(amount) {
            Ok(amount) => self.add_money(amount),
            Err(err) => {
                tracing::debug!(%err, "deposit rejected");
                false
            }
        }
    }

    /// Take `amount` out of this account.
    fn withdraw(&self, amount: f64, reason: Option<&str>) -> bool {
        let span = tracing::debug_span!(
            "withdraw",
            account = %self.name(),
            amount,
            reason = reason.unwrap_or_default()
        );
        let _guard = span.enter();

        match ensure_positive(amount) {
            Ok(amount) => self.subtract_money(amount),
            Err(err) => {
                tracing::debug!(%err, "withdrawal rejected");
                false
            }
        }
    }

    /// Move `amount` from this account into `collector`.
    ///
    /// If the collector refuses the money it is put back here and the payment
    /// reports `false`.
    fn pay_to(&self, amount: f64, collector: &dyn Account, reason: Option<&str>) -> bool {
        if !self.withdraw(amount, reason) {
            return false;
        }

        if collector.deposit(amount, reason) {
            return true;
        }

        tracing::warn!(
            from = %self.name(),
            to = %collector.name(),
            amount,
            "payment refused by collector; refunding"
        );
        if !self.deposit(amount, Some("refund")) {
            tracing::error!(account = %self.name(), amount, "refund failed");
        }
        false
    }

    /// Overwrite the balance.
    ///
    /// Plain ledger entries cannot go negative, so negative targets are refused.
    fn set_balance(&self, amount: f64, reason: Option<&str>) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            tracing::debug!(account = %self.name(), amount, reason, "set balance rejected");
            return false;
        }
        self.ledger().set_balance(self.name(), amount, self.world())
    }

    /// Balance as reported by the ledger.
    fn holding_balance(&self) -> AccountResult<f64> {
        self.ledger()
            .balance(self.name(), self.world())
            .map_err(|e| AccountError::holdings(self.name(), e))
    }

    fn can_pay_from_holdings(&self, amount: f64) -> AccountResult<bool> {
        Ok(self.holding_balance()? >= amount)
    }

    /// Display form of the balance; [`FORMAT_ERROR`] if it cannot be read.
    fn holding_formatted_balance(&self) -> String {
        match self.holding_balance() {
            Ok(balance) => self.ledger().format_balance(balance),
            Err(err) => {
                tracing::warn!(account = %self.name(), %err, "cannot format balance");
                FORMAT_ERROR.to_string()
            }
        }
    }

    /// Open the ledger entry for this account.
    fn create_account(&self) -> bool {
        self.ledger().create_account(self.name(), self.world())
    }

    /// Delete the ledger entry for this account.
    fn remove_account(&self) {
        self.ledger().remove_account(self.name());
    }
}

/// Account with no rules of its own: every call goes straight to the ledger.
#[derive(Clone)]
pub struct EconomyAccount {
    name: String,
    world: WorldId,
    ledger: Arc<dyn EconomyLedger>,
}

impl EconomyAccount {
    pub fn new(name: impl Into<String>, world: WorldId, ledger: Arc<dyn EconomyLedger>) -> Self {
        Self {
            name: name.into(),
            world,
            ledger,
        }
    }
}

impl core::fmt::Debug for EconomyAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EconomyAccount")
            .field("name", &self.name)
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

impl Account for EconomyAccount {
    fn name(&self) -> &str {
        &self.name
    }

    fn world(&self) -> WorldId {
        self.world
    }

    fn ledger(&self) -> &dyn EconomyLedger {
        self.ledger.as_ref()
    }
}
