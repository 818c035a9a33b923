//! Amount checks applied before any ledger call.

use crate::error::{AccountError, AccountResult};

/// Accept only finite, strictly positive amounts.
pub fn ensure_positive(amount: f64) -> AccountResult<f64> {
    if !amount.is_finite() {
        return Err(AccountError::invalid_amount(format!(
            "amount must be finite (got {amount})"
        )));
    }
    if amount <= 0.0 {
        return Err(AccountError::invalid_amount(format!(
            "amount must be positive (got {amount})"
        )));
    }
    Ok(amount)
}

/// `true` when `cap` is set and `value` would exceed it.
///
/// A cap of zero (or below) means uncapped.
pub fn exceeds_cap(value: f64, cap: f64) -> bool {
    cap > 0.0 && value > cap
}
