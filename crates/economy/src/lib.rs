//! Economy accounts backed by an external ledger.
//!
//! Pure account rules: the ledger (wherever balances actually live) is a
//! collaborator behind [`EconomyLedger`].

pub mod account;
pub mod capped;
pub mod in_memory;
pub mod ledger;
pub mod settings;
mod shadow;

pub use account::{Account, EconomyAccount, FORMAT_ERROR};
pub use capped::{CappedDebtAccount, SETTLE_TOLERANCE, Standing};
pub use in_memory::InMemoryLedger;
pub use ledger::EconomyLedger;
pub use settings::EconomySettings;
pub use shadow::ShadowDebtAccount;
