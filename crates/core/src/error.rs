//! Error model shared by the ledger collaborator and the accounts built on it.

use thiserror::Error;

/// Result of a call into the external ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of an account-level query.
pub type AccountResult<T> = Result<T, AccountError>;

/// Failure reported by the external ledger.
///
/// The ledger owns the actual balances; these errors describe why it could not
/// answer (unknown name, backend down), never a business rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No ledger entry exists under this name.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The ledger backend could not be reached (or a dependency is missing).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn unknown_account(name: impl Into<String>) -> Self {
        Self::UnknownAccount(name.into())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Account-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The ledger could not report holdings for this account.
    #[error("economy error getting holdings for {name}")]
    Holdings {
        name: String,
        #[source]
        source: LedgerError,
    },

    /// An amount was rejected before reaching the ledger.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl AccountError {
    pub fn holdings(name: impl Into<String>, source: LedgerError) -> Self {
        Self::Holdings {
            name: name.into(),
            source,
        }
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    /// The underlying ledger failure, if any.
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            AccountError::Holdings { source, .. } => Some(source),
            AccountError::InvalidAmount(_) => None,
        }
    }
}
