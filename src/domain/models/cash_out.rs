//! Domain model for cash-out requests (escrow semantics).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A request to convert balance into real money.
///
/// The amount is debited at request time, so a pending request holds the funds
/// in escrow. Approval finalizes without touching the balance; rejection
/// refunds the held amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub id: String,
    pub child_id: String,
    pub amount: f64,
    pub status: CashOutStatus,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashOutStatus {
    Pending,
    Approved,
    Rejected,
}

impl CashOutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashOutStatus::Pending => "pending",
            CashOutStatus::Approved => "approved",
            CashOutStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CashOutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashOutStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CashOutStatus::Pending),
            "approved" => Ok(CashOutStatus::Approved),
            "rejected" => Ok(CashOutStatus::Rejected),
            other => Err(anyhow::anyhow!("unknown cash-out status: {}", other)),
        }
    }
}
