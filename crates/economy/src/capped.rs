//! Account with a balance cap and a bounded debt slot.
//!
//! Instead of going negative, a [`CappedDebtAccount`] drains its main holdings
//! to zero and records the shortfall in a [`ShadowDebtAccount`]. Deposits pay
//! that debt down before crediting main holdings again. Solvency is never
//! stored: it is read from the debt slot on every decision.

use std::sync::Arc;

use coffer_core::{AccountError, AccountResult, WorldId, exceeds_cap};

use crate::account::{Account, FORMAT_ERROR};
use crate::ledger::EconomyLedger;
use crate::settings::EconomySettings;
use crate::shadow::ShadowDebtAccount;

/// Debt within this distance of a payment counts as fully paid.
pub const SETTLE_TOLERANCE: f64 = 1e-9;

/// Where an account stands, as read from the ledger.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Standing {
    /// No debt; `holdings` is the main ledger balance.
    Solvent { holdings: f64 },
    /// Debt outstanding; main holdings are zero.
    Bankrupt { debt: f64 },
}

impl Standing {
    /// Signed balance: holdings when solvent, minus the debt when bankrupt.
    pub fn balance(self) -> f64 {
        match self {
            Standing::Solvent { holdings } => holdings,
            Standing::Bankrupt { debt } => -debt,
        }
    }

    pub fn is_bankrupt(self) -> bool {
        matches!(self, Standing::Bankrupt { .. })
    }
}

/// Ledger-backed account with a balance cap and a debt cap.
///
/// Invariants (given a single writer per account):
/// - main holdings and debt are never both non-zero
/// - debt never exceeds `debt_cap`, holdings never exceed `balance_cap`
///   (a cap `<= 0` is uncapped)
/// - the debt slot is opened and removed together with the account
pub struct CappedDebtAccount {
    name: String,
    world: WorldId,
    ledger: Arc<dyn EconomyLedger>,
    balance_cap: f64,
    debt_cap: f64,
    debt_account: ShadowDebtAccount,
}

impl CappedDebtAccount {
    /// Create the account handle; caps start at the settings defaults.
    ///
    /// No ledger call is made; use [`Account::create_account`] to open the
    /// ledger entries.
    pub fn new(
        name: impl Into<String>,
        world: WorldId,
        ledger: Arc<dyn EconomyLedger>,
        settings: &EconomySettings,
    ) -> Self {
        let name = name.into();
        let debt_account = ShadowDebtAccount::for_owner(
            &name,
            &settings.debt_account_suffix,
            world,
            Arc::clone(&ledger),
        );

        Self {
            name,
            world,
            ledger,
            balance_cap: settings.default_balance_cap,
            debt_cap: settings.default_debt_cap,
            debt_account,
        }
    }

    pub fn with_caps(mut self, balance_cap: f64, debt_cap: f64) -> Self {
        self.balance_cap = balance_cap;
        self.debt_cap = debt_cap;
        self
    }

    /// Maximum holdings allowed in this account (`0` = uncapped).
    pub fn balance_cap(&self) -> f64 {
        self.balance_cap
    }

    pub fn set_balance_cap(&mut self, balance_cap: f64) {
        self.balance_cap = balance_cap;
    }

    /// Maximum debt this account may carry (`0` = uncapped).
    pub fn debt_cap(&self) -> f64 {
        self.debt_cap
    }

    pub fn set_debt_cap(&mut self, debt_cap: f64) {
        self.debt_cap = debt_cap;
    }

    /// Ledger key of the debt slot.
    pub fn debt_account_name(&self) -> &str {
        self.debt_account.name()
    }

    /// Outstanding debt as a positive number.
    pub fn debt_balance(&self) -> AccountResult<f64> {
        self.debt_account.holding_balance()
    }

    pub fn is_bankrupt(&self) -> AccountResult<bool> {
        Ok(self.debt_balance()? > 0.0)
    }

    pub fn standing(&self) -> AccountResult<Standing> {
        let debt = self.debt_balance()?;
        if debt > 0.0 {
            return Ok(Standing::Bankrupt { debt });
        }
        Ok(Standing::Solvent {
            holdings: self.main_balance()?,
        })
    }

    fn main_balance(&self) -> AccountResult<f64> {
        self.ledger
            .balance(&self.name, self.world)
            .map_err(|e| AccountError::holdings(&self.name, e))
    }

    fn try_subtract(&self, amount: f64) -> AccountResult<bool> {
        match self.standing()? {
            Standing::Bankrupt { debt } => {
                if exceeds_cap(debt + amount, self.debt_cap) {
                    tracing::debug!(
                        account = %self.name,
                        debt,
                        amount,
                        debt_cap = self.debt_cap,
                        "withdrawal would exceed debt cap"
                    );
                    return Ok(false);
                }
                Ok(self.add_debt(amount))
            }
            Standing::Solvent { holdings } if holdings < amount => {
                let overflow = amount - holdings;
                if exceeds_cap(overflow, self.debt_cap) {
                    tracing::debug!(
                        account = %self.name,
                        overflow,
                        debt_cap = self.debt_cap,
                        "overdraft would exceed debt cap"
                    );
                    return Ok(false);
                }

                // main must be empty before debt is recorded
                if !self.ledger.set_balance(&self.name, 0.0, self.world) {
                    return Ok(false);
                }
                if !self.add_debt(overflow) {
                    tracing::error!(
                        account = %self.name,
                        overflow,
                        "holdings drained but debt was not recorded"
                    );
                    return Ok(false);
                }

                tracing::info!(account = %self.name, debt = overflow, "account entered debt");
                Ok(true)
            }
            Standing::Solvent { .. } => Ok(self.ledger.subtract(&self.name, amount, self.world)),
        }
    }

    fn try_add(&self, amount: f64) -> AccountResult<bool> {
        let standing = self.standing()?;

        if exceeds_cap(standing.balance() + amount, self.balance_cap) {
            tracing::debug!(
                account = %self.name,
                balance = standing.balance(),
                amount,
                balance_cap = self.balance_cap,
                "deposit would exceed balance cap"
            );
            return Ok(false);
        }

        match standing {
            Standing::Bankrupt { debt } => Ok(self.remove_debt(debt, amount)),
            Standing::Solvent { .. } => Ok(self.ledger.add(&self.name, amount, self.world)),
        }
    }

    fn add_debt(&self, amount: f64) -> bool {
        self.debt_account.deposit(amount, None)
    }

    /// Pay `amount` against `debt`; anything left over lands in main holdings.
    ///
    /// A payment within [`SETTLE_TOLERANCE`] of the debt settles it, so float
    /// rounding never leaves a dust debt behind.
    fn remove_debt(&self, debt: f64, amount: f64) -> bool {
        if amount + SETTLE_TOLERANCE >= debt {
            let net = (amount - debt).max(0.0);
            if !self.debt_account.set_balance(0.0, None) {
                return false;
            }
            tracing::info!(account = %self.name, credit = net, "debt cleared");
            if net == 0.0 {
                return true;
            }
            if !self.ledger.add(&self.name, net, self.world) {
                tracing::error!(
                    account = %self.name,
                    credit = net,
                    "debt cleared but leftover credit was not recorded"
                );
                return false;
            }
            return true;
        }

        self.debt_account.withdraw(amount, None)
    }
}

impl core::fmt::Debug for CappedDebtAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CappedDebtAccount")
            .field("name", &self.name)
            .field("world", &self.world)
            .field("balance_cap", &self.balance_cap)
            .field("debt_cap", &self.debt_cap)
            .field("debt_account", &self.debt_account)
            .finish_non_exhaustive()
    }
}

impl Account for CappedDebtAccount {
    fn name(&self) -> &str {
        &self.name
    }

    fn world(&self) -> WorldId {
        self.world
    }

    fn ledger(&self) -> &dyn EconomyLedger {
        self.ledger.as_ref()
    }

    fn add_money(&self, amount: f64) -> bool {
        self.try_add(amount).unwrap_or_else(|err| {
            tracing::error!(account = %self.name, amount, %err, "deposit failed");
            false
        })
    }

    fn subtract_money(&self, amount: f64) -> bool {
        self.try_subtract(amount).unwrap_or_else(|err| {
            tracing::error!(account = %self.name, amount, %err, "withdrawal failed");
            false
        })
    }

    /// Negative targets are written to the debt slot; both sides respect
    /// their cap.
    fn set_balance(&self, amount: f64, reason: Option<&str>) -> bool {
        if !amount.is_finite() {
            return false;
        }

        if amount < 0.0 {
            let debt = -amount;
            if exceeds_cap(debt, self.debt_cap) {
                tracing::debug!(account = %self.name, debt, reason, "set balance beyond debt cap");
                return false;
            }
            return self.ledger.set_balance(&self.name, 0.0, self.world)
                && self.debt_account.set_balance(debt, reason);
        }

        if exceeds_cap(amount, self.balance_cap) {
            tracing::debug!(account = %self.name, amount, reason, "set balance beyond balance cap");
            return false;
        }
        self.debt_account.set_balance(0.0, reason)
            && self.ledger.set_balance(&self.name, amount, self.world)
    }

    fn holding_balance(&self) -> AccountResult<f64> {
        self.standing().map(Standing::balance)
    }

    fn holding_formatted_balance(&self) -> String {
        match self.standing() {
            Ok(Standing::Bankrupt { debt }) => format!("-{}", self.ledger.format_balance(debt)),
            Ok(Standing::Solvent { holdings }) => self.ledger.format_balance(holdings),
            Err(err) => {
                tracing::warn!(account = %self.name, %err, "cannot format balance");
                FORMAT_ERROR.to_string()
            }
        }
    }

    /// Open the main entry and the debt slot together.
    fn create_account(&self) -> bool {
        let existed = self.ledger.has_account(&self.name);
        if !self.ledger.create_account(&self.name, self.world) {
            return false;
        }

        if !self.debt_account.create_account() {
            tracing::warn!(account = %self.name, "debt slot could not be opened");
            if !existed {
                self.ledger.remove_account(&self.name);
            }
            return false;
        }
        true
    }

    /// Remove the debt slot, then the main entry.
    fn remove_account(&self) {
        self.debt_account.remove_account();
        self.ledger.remove_account(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryLedger;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Ledger that refuses chosen mutations on chosen names and can cap the
    /// number of balance reads it answers.
    struct FaultyLedger {
        inner: InMemoryLedger,
        refuse_set: Option<&'static str>,
        refuse_add: Option<&'static str>,
        reads_left: AtomicUsize,
    }

    impl FaultyLedger {
        fn new() -> Self {
            Self {
                inner: InMemoryLedger::new(),
                refuse_set: None,
                refuse_add: None,
                reads_left: AtomicUsize::new(usize::MAX),
            }
        }

        fn refusing_set(mut self, name: &'static str) -> Self {
            self.refuse_set = Some(name);
            self
        }

        fn refusing_add(mut self, name: &'static str) -> Self {
            self.refuse_add = Some(name);
            self
        }

        fn allow_reads(&self, n: usize) {
            self.reads_left.store(n, Ordering::SeqCst);
        }
    }

    impl EconomyLedger for FaultyLedger {
        fn balance(&self, name: &str, world: WorldId) -> coffer_core::LedgerResult<f64> {
            let left = self.reads_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(coffer_core::LedgerError::unavailable("read budget spent"));
            }
            if left != usize::MAX {
                self.reads_left.store(left - 1, Ordering::SeqCst);
            }
            self.inner.balance(name, world)
        }

        fn set_balance(&self, name: &str, amount: f64, world: WorldId) -> bool {
            self.refuse_set != Some(name) && self.inner.set_balance(name, amount, world)
        }

        fn add(&self, name: &str, amount: f64, world: WorldId) -> bool {
            self.refuse_add != Some(name) && self.inner.add(name, amount, world)
        }

        fn subtract(&self, name: &str, amount: f64, world: WorldId) -> bool {
            self.inner.subtract(name, amount, world)
        }

        fn format_balance(&self, amount: f64) -> String {
            self.inner.format_balance(amount)
        }

        fn has_account(&self, name: &str) -> bool {
            self.inner.has_account(name)
        }

        fn create_account(&self, name: &str, world: WorldId) -> bool {
            self.inner.create_account(name, world)
        }

        fn remove_account(&self, name: &str) {
            self.inner.remove_account(name);
        }
    }

    fn open_faulty(ledger: FaultyLedger) -> (CappedDebtAccount, Arc<FaultyLedger>) {
        let ledger = Arc::new(ledger);
        let account = CappedDebtAccount::new(
            "Oakvale",
            WorldId::new(),
            ledger.clone(),
            &EconomySettings::default(),
        )
        .with_caps(BALANCE_CAP, DEBT_CAP);
        assert!(account.create_account());
        (account, ledger)
    }

    const BALANCE_CAP: f64 = 500.0;
    const DEBT_CAP: f64 = 300.0;

    fn open(balance_cap: f64, debt_cap: f64) -> (CappedDebtAccount, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let account = CappedDebtAccount::new(
            "Oakvale",
            WorldId::new(),
            ledger.clone(),
            &EconomySettings::default(),
        )
        .with_caps(balance_cap, debt_cap);
        assert!(account.create_account());
        (account, ledger)
    }

    /// (main, debt) straight from the ledger.
    fn raw(account: &CappedDebtAccount, ledger: &InMemoryLedger) -> (f64, f64) {
        let main = ledger.balance(account.name(), account.world()).unwrap();
        let debt = ledger
            .balance(account.debt_account_name(), account.world())
            .unwrap();
        (main, debt)
    }

    #[test]
    fn create_opens_main_and_debt_slot() {
        let (account, ledger) = open(0.0, 0.0);
        assert!(ledger.has_account("Oakvale"));
        assert!(ledger.has_account("Oakvale[DEBT]-"));
        assert_eq!(account.standing().unwrap(), Standing::Solvent { holdings: 0.0 });
    }

    #[test]
    fn withdraw_within_holdings_stays_solvent() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(100.0, None));
        assert!(account.withdraw(40.0, None));
        assert_eq!(raw(&account, &ledger), (60.0, 0.0));
        assert!(!account.is_bankrupt().unwrap());
    }

    #[test]
    fn overdraft_drains_holdings_into_debt() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(30.0, None));
        assert!(account.withdraw(100.0, Some("upkeep")));

        assert_eq!(raw(&account, &ledger), (0.0, 70.0));
        assert!(account.is_bankrupt().unwrap());
        assert_eq!(account.holding_balance().unwrap(), -70.0);
    }

    #[test]
    fn overdraft_beyond_debt_cap_changes_nothing() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(10.0, None));
        assert!(!account.withdraw(311.0, None));
        assert_eq!(raw(&account, &ledger), (10.0, 0.0));
    }

    #[test]
    fn withdraw_while_bankrupt_grows_debt_up_to_cap() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.withdraw(200.0, None));
        assert!(account.withdraw(100.0, None));
        assert_eq!(raw(&account, &ledger), (0.0, 300.0));

        assert!(!account.withdraw(1.0, None));
        assert_eq!(raw(&account, &ledger), (0.0, 300.0));
    }

    #[test]
    fn zero_debt_cap_allows_unbounded_debt() {
        let (account, ledger) = open(0.0, 0.0);
        assert!(account.withdraw(1_000_000.0, None));
        assert!(account.withdraw(1_000_000.0, None));
        assert_eq!(raw(&account, &ledger), (0.0, 2_000_000.0));
    }

    #[test]
    fn deposit_smaller_than_debt_pays_it_down() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.withdraw(80.0, None));
        assert!(account.deposit(30.0, None));
        assert_eq!(raw(&account, &ledger), (0.0, 50.0));
        assert!(account.is_bankrupt().unwrap());
    }

    #[test]
    fn deposit_larger_than_debt_clears_it_and_credits_the_rest() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.withdraw(80.0, None));
        assert!(account.deposit(130.0, None));
        assert_eq!(raw(&account, &ledger), (50.0, 0.0));
        assert_eq!(account.standing().unwrap(), Standing::Solvent { holdings: 50.0 });
    }

    #[test]
    fn leftover_credit_after_debt_still_respects_balance_cap() {
        let (account, ledger) = open(100.0, DEBT_CAP);
        assert!(account.withdraw(50.0, None));
        // -50 + 160 = 110 > 100
        assert!(!account.deposit(160.0, None));
        assert_eq!(raw(&account, &ledger), (0.0, 50.0));
        assert!(account.deposit(150.0, None));
        assert_eq!(raw(&account, &ledger), (100.0, 0.0));
    }

    #[test]
    fn caps_can_be_changed_after_construction() {
        let (mut account, _) = open(BALANCE_CAP, DEBT_CAP);
        account.set_balance_cap(10.0);
        account.set_debt_cap(5.0);
        assert_eq!(account.balance_cap(), 10.0);
        assert_eq!(account.debt_cap(), 5.0);
        assert!(!account.deposit(11.0, None));
        assert!(!account.withdraw(6.0, None));
    }

    #[test]
    fn set_balance_routes_negative_targets_to_debt() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(40.0, None));

        assert!(account.set_balance(-25.0, Some("fine")));
        assert_eq!(raw(&account, &ledger), (0.0, 25.0));

        assert!(account.set_balance(75.0, None));
        assert_eq!(raw(&account, &ledger), (75.0, 0.0));

        assert!(!account.set_balance(-301.0, None));
        assert!(!account.set_balance(501.0, None));
        assert_eq!(raw(&account, &ledger), (75.0, 0.0));
    }

    #[test]
    fn formatted_balance_prefixes_debt_with_minus() {
        let (account, _) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(12.0, None));
        assert_eq!(account.holding_formatted_balance(), "$12.00");

        assert!(account.withdraw(32.0, None));
        assert_eq!(account.holding_formatted_balance(), "-$20.00");
    }

    #[test]
    fn ledger_outage_degrades_to_failure() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.deposit(10.0, None));
        ledger.set_available(false);

        assert!(!account.deposit(1.0, None));
        assert!(!account.withdraw(1.0, None));
        assert_eq!(account.holding_formatted_balance(), FORMAT_ERROR);
        assert!(matches!(
            account.holding_balance(),
            Err(AccountError::Holdings { .. })
        ));
        assert!(account.is_bankrupt().is_err());

        ledger.set_available(true);
        assert_eq!(raw(&account, &ledger), (10.0, 0.0));
    }

    #[test]
    fn remove_drops_both_entries() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        account.remove_account();
        assert!(ledger.is_empty());
        assert!(account.holding_balance().is_err());
    }

    #[test]
    fn overdraft_records_no_debt_when_holdings_cannot_be_drained() {
        let (account, ledger) = open_faulty(FaultyLedger::new().refusing_set("Oakvale"));
        assert!(account.deposit(30.0, None));

        assert!(!account.withdraw(100.0, None));
        assert_eq!(raw(&account, &ledger.inner), (30.0, 0.0));
    }

    #[test]
    fn overdraft_leaves_holdings_drained_when_debt_is_not_recorded() {
        let (account, ledger) = open_faulty(FaultyLedger::new().refusing_add("Oakvale[DEBT]-"));
        assert!(account.deposit(30.0, None));

        // no rollback: the drained holdings stay drained
        assert!(!account.withdraw(100.0, None));
        assert_eq!(raw(&account, &ledger.inner), (0.0, 0.0));
        assert_eq!(account.holding_balance().unwrap(), 0.0);
    }

    #[test]
    fn paydown_leaves_debt_cleared_when_credit_is_not_recorded() {
        let (account, ledger) = open_faulty(FaultyLedger::new().refusing_add("Oakvale"));
        assert!(account.withdraw(50.0, None));
        assert_eq!(raw(&account, &ledger.inner), (0.0, 50.0));

        assert!(!account.deposit(80.0, None));
        assert_eq!(raw(&account, &ledger.inner), (0.0, 0.0));
        assert!(!account.is_bankrupt().unwrap());
    }

    #[test]
    fn formatted_debt_reads_the_ledger_once() {
        let (account, ledger) = open_faulty(FaultyLedger::new());
        assert!(account.withdraw(20.0, None));

        // standing needs exactly one read (the debt slot) when bankrupt
        ledger.allow_reads(1);
        assert_eq!(account.holding_formatted_balance(), "-$20.00");

        ledger.allow_reads(0);
        assert_eq!(account.holding_formatted_balance(), FORMAT_ERROR);
    }

    #[test]
    fn paying_off_rounded_debt_settles_it() {
        let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
        assert!(account.withdraw(0.1, None));
        assert!(account.withdraw(0.2, None));
        // 0.1 + 0.2 is not exactly 0.3
        assert!(account.debt_balance().unwrap() > 0.3);

        assert!(account.deposit(0.3, None));
        assert!(!account.is_bankrupt().unwrap());
        assert_eq!(raw(&account, &ledger), (0.0, 0.0));
        assert_eq!(account.holding_balance().unwrap(), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever the sequence of deposits/withdrawals, main holdings
        /// and debt are never both positive and both caps hold.
        #[test]
        fn holdings_and_debt_never_coexist(
            ops in prop::collection::vec((any::<bool>(), 1u32..400u32), 1..40)
        ) {
            let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);

            for (is_deposit, amount) in ops {
                let amount = f64::from(amount);
                if is_deposit {
                    account.deposit(amount, None);
                } else {
                    account.withdraw(amount, None);
                }

                let (main, debt) = raw(&account, &ledger);
                prop_assert!(!(main > 0.0 && debt > 0.0), "main={main} debt={debt}");
                prop_assert!(debt >= 0.0 && debt <= DEBT_CAP);
                prop_assert!(main <= BALANCE_CAP);
                prop_assert_eq!(account.holding_balance().unwrap(), main - debt);
            }
        }

        /// Property: a withdrawal that would push debt past the cap is refused
        /// and leaves the ledger untouched.
        #[test]
        fn debt_cap_rejection_is_side_effect_free(
            debt in 1u32..=300u32,
            excess in 1u32..200u32,
        ) {
            let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
            prop_assert!(account.set_balance(-f64::from(debt), None));
            let before = raw(&account, &ledger);

            let amount = DEBT_CAP - f64::from(debt) + f64::from(excess);
            prop_assert!(!account.withdraw(amount, None));
            prop_assert_eq!(raw(&account, &ledger), before);
        }

        /// Property: a deposit that would push holdings past the cap is refused
        /// and leaves the ledger untouched.
        #[test]
        fn balance_cap_rejection_is_side_effect_free(
            holdings in 0u32..=500u32,
            excess in 1u32..200u32,
        ) {
            let (account, ledger) = open(BALANCE_CAP, DEBT_CAP);
            prop_assert!(account.set_balance(f64::from(holdings), None));
            let before = raw(&account, &ledger);

            let amount = BALANCE_CAP - f64::from(holdings) + f64::from(excess);
            prop_assert!(!account.deposit(amount, None));
            prop_assert_eq!(raw(&account, &ledger), before);
        }
    }
}
