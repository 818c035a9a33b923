//! Economy settings (debt slot naming, default caps).

use serde::{Deserialize, Serialize};

pub const DEBT_ACCOUNT_SUFFIX_ENV: &str = "COFFER_DEBT_ACCOUNT_SUFFIX";
pub const DEFAULT_BALANCE_CAP_ENV: &str = "COFFER_DEFAULT_BALANCE_CAP";
pub const DEFAULT_DEBT_CAP_ENV: &str = "COFFER_DEFAULT_DEBT_CAP";

pub const DEFAULT_DEBT_ACCOUNT_SUFFIX: &str = "[DEBT]-";

/// Settings read once when accounts are constructed.
///
/// Caps of `0` mean uncapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomySettings {
    /// Appended to an owner's name to address its debt slot.
    pub debt_account_suffix: String,
    pub default_balance_cap: f64,
    pub default_debt_cap: f64,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            debt_account_suffix: DEFAULT_DEBT_ACCOUNT_SUFFIX.to_string(),
            default_balance_cap: 0.0,
            default_debt_cap: 0.0,
        }
    }
}

impl EconomySettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Missing or malformed values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let debt_account_suffix = match lookup(DEBT_ACCOUNT_SUFFIX_ENV) {
            Some(suffix) if suffix.is_empty() => {
                // an empty suffix would make the debt slot alias its owner
                tracing::warn!(
                    "{DEBT_ACCOUNT_SUFFIX_ENV} is empty; using {DEFAULT_DEBT_ACCOUNT_SUFFIX:?}"
                );
                defaults.debt_account_suffix
            }
            Some(suffix) => suffix,
            None => defaults.debt_account_suffix,
        };

        Self {
            debt_account_suffix,
            default_balance_cap: cap_from(&lookup, DEFAULT_BALANCE_CAP_ENV, defaults.default_balance_cap),
            default_debt_cap: cap_from(&lookup, DEFAULT_DEBT_CAP_ENV, defaults.default_debt_cap),
        }
    }
}

fn cap_from(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<f64>() {
        Ok(cap) if cap.is_finite() && cap >= 0.0 => cap,
        _ => {
            tracing::warn!(key, value = %raw, "invalid cap; using default {default}");
            default
        }
    }
}
