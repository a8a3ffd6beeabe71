//! Domain model for a child and their allowance configuration.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A child account. `balance` is a cached running total that must always equal
/// the sum of the child's ledger transactions; it is only ever mutated through
/// the guarded compound operations in the repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// May go negative via admin overrides; the debit guard only protects
    /// spend-side operations.
    pub balance: f64,
    pub allowance_amount: f64,
    pub allowance_frequency: AllowanceFrequency,
    pub allowance_start_date: Option<NaiveDate>,
    /// Reference date for the scheduler: the last day an allowance deposit was
    /// applied, or the seeded baseline when no deposit has happened yet.
    pub last_allowance_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

impl Child {
    /// Whether the scheduler should consider this child at all.
    pub fn has_active_allowance(&self) -> bool {
        self.allowance_frequency != AllowanceFrequency::None && self.allowance_amount > 0.0
    }
}

/// How often a recurring allowance is deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowanceFrequency {
    None,
    Weekly,
    Monthly,
}

impl AllowanceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowanceFrequency::None => "none",
            AllowanceFrequency::Weekly => "weekly",
            AllowanceFrequency::Monthly => "monthly",
        }
    }

    /// Singular period noun used in deposit descriptions.
    pub fn period_label(&self) -> &'static str {
        match self {
            AllowanceFrequency::None => "period",
            AllowanceFrequency::Weekly => "week",
            AllowanceFrequency::Monthly => "month",
        }
    }
}

impl fmt::Display for AllowanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllowanceFrequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AllowanceFrequency::None),
            "weekly" => Ok(AllowanceFrequency::Weekly),
            "monthly" => Ok(AllowanceFrequency::Monthly),
            other => Err(anyhow::anyhow!("unknown allowance frequency: {}", other)),
        }
    }
}
