//! `coffer-core` — primitives shared by the ledger collaborator and the accounts.
//!
//! No IO lives here: only errors, identifiers, and amount rules.

pub mod amount;
pub mod error;
pub mod id;

pub use amount::{ensure_positive, exceeds_cap};
pub use error::{AccountError, AccountResult, LedgerError, LedgerResult};
pub use id::WorldId;
