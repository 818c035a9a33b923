use std::sync::Arc;

use coffer_core::WorldId;

use crate::account::Account;
use crate::ledger::EconomyLedger;

/// Ledger slot holding an owner's debt as a positive number.
///
/// Economy backends generally cannot hold negative balances, so the owner
/// keeps its debt here instead. Only the owning account addresses it.
#[derive(Clone)]
pub struct ShadowDebtAccount {
    name: String,
    world: WorldId,
    ledger: Arc<dyn EconomyLedger>,
}

impl ShadowDebtAccount {
    /// Slot for `owner_name`, named `owner_name + suffix`.
    pub(crate) fn for_owner(
        owner_name: &str,
        suffix: &str,
        world: WorldId,
        ledger: Arc<dyn EconomyLedger>,
    ) -> Self {
        Self {
            name: format!("{owner_name}{suffix}"),
            world,
            ledger,
        }
    }
}

impl core::fmt::Debug for ShadowDebtAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShadowDebtAccount")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Account for ShadowDebtAccount {
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
