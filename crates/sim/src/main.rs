//! Replays a scripted sequence of operations against one capped account.
//!
//! ```text
//! coffer-sim deposit 80 withdraw 100 deposit 20 balance
//! ```
//!
//! Caps and the debt suffix come from the `COFFER_*` environment variables.

use std::sync::Arc;

use anyhow::{Context, bail};
use coffer_core::WorldId;
use coffer_economy::{Account, CappedDebtAccount, EconomySettings, InMemoryLedger};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Deposit(f64),
    Withdraw(f64),
    Balance,
}

fn parse_ops<I, S>(args: I) -> anyhow::Result<Vec<Op>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ops = Vec::new();
    let mut args = args.into_iter();

    while let Some(word) = args.next() {
        let word = word.as_ref();
        let op = match word {
            "balance" => Op::Balance,
            "deposit" | "withdraw" => {
                let raw = args
                    .next()
                    .with_context(|| format!("`{word}` needs an amount"))?;
                let amount: f64 = raw
                    .as_ref()
                    .parse()
                    .with_context(|| format!("invalid amount for `{word}`: {}", raw.as_ref()))?;
                if word == "deposit" {
                    Op::Deposit(amount)
                } else {
                    Op::Withdraw(amount)
                }
            }
            other => bail!("unknown operation `{other}` (expected deposit, withdraw or balance)"),
        };
        ops.push(op);
    }

    Ok(ops)
}

fn main() -> anyhow::Result<()> {
    coffer_observability::init();

    let ops = parse_ops(std::env::args().skip(1))?;
    if ops.is_empty() {
        bail!("usage: coffer-sim [deposit <amount> | withdraw <amount> | balance]...");
    }

    let settings = EconomySettings::from_env();
    let ledger = Arc::new(InMemoryLedger::new());
    let account = CappedDebtAccount::new("sim", WorldId::new(), ledger, &settings);
    if !account.create_account() {
        bail!("could not open ledger entries for `{}`", account.name());
    }

    tracing::info!(
        balance_cap = account.balance_cap(),
        debt_cap = account.debt_cap(),
        "replaying {} operations",
        ops.len()
    );

    for op in ops {
        let accepted = match op {
            Op::Deposit(amount) => account.deposit(amount, Some("sim")),
            Op::Withdraw(amount) => account.withdraw(amount, Some("sim")),
            Op::Balance => true,
        };
        let bankrupt = account.is_bankrupt()?;
        println!(
            "{op:?}: {} -> {}{}",
            if accepted { "ok" } else { "refused" },
            account.holding_formatted_balance(),
            if bankrupt { " (bankrupt)" } else { "" }
        );
    }

    Ok(())
}
