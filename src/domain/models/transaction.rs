//! Domain model for ledger transactions.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An immutable ledger entry. The transaction log is the source of truth for
/// "what happened"; `Child::balance` is the cached running total of these rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub child_id: String,
    /// Signed: positive credits the child, negative debits.
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub description: String,
    pub created_at: String,
}

/// What kind of event produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Chore approval credit.
    Earn,
    /// Reward claim debit.
    Spend,
    /// Manual credit from an admin.
    Bonus,
    /// Manual debit from an admin.
    Deduction,
    /// Balance-override delta.
    Admin,
    /// Scheduler deposit.
    Allowance,
    /// Escrow debit at cash-out request time.
    CashOut,
    /// Escrow reversal when a cash-out is rejected.
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Earn => "earn",
            TransactionType::Spend => "spend",
            TransactionType::Bonus => "bonus",
            TransactionType::Deduction => "deduction",
            TransactionType::Admin => "admin",
            TransactionType::Allowance => "allowance",
            TransactionType::CashOut => "cash_out",
            TransactionType::Refund => "refund",
        }
    }

    /// Normalise a manual amount to the sign this type implies: deductions and
    /// spends always debit, everything else always credits.
    pub fn signed_amount(&self, amount: f64) -> f64 {
        match self {
            TransactionType::Deduction | TransactionType::Spend => -amount.abs(),
            _ => amount.abs(),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earn" => Ok(TransactionType::Earn),
            "spend" => Ok(TransactionType::Spend),
            "bonus" => Ok(TransactionType::Bonus),
            "deduction" => Ok(TransactionType::Deduction),
            "admin" => Ok(TransactionType::Admin),
            "allowance" => Ok(TransactionType::Allowance),
            "cash_out" => Ok(TransactionType::CashOut),
            "refund" => Ok(TransactionType::Refund),
            other => Err(anyhow::anyhow!("unknown transaction type: {}", other)),
        }
    }
}
