//! Domain models for chores and their assignments.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chore template. Assignments reference it; the value credited at approval
/// time is the chore's value at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub title: String,
    pub description: String,
    pub value: f64,
    pub frequency: ChoreFrequency,
    /// 0 = Sunday .. 6 = Saturday; required iff `frequency` is weekly.
    pub day_of_week: Option<u8>,
    pub created_at: String,
    pub updated_at: String,
}

/// How a chore recurs when assigned over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoreFrequency {
    #[serde(rename = "one-off")]
    OneOff,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

impl ChoreFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoreFrequency::OneOff => "one-off",
            ChoreFrequency::Daily => "daily",
            ChoreFrequency::Weekly => "weekly",
        }
    }
}

impl fmt::Display for ChoreFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoreFrequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-off" => Ok(ChoreFrequency::OneOff),
            "daily" => Ok(ChoreFrequency::Daily),
            "weekly" => Ok(ChoreFrequency::Weekly),
            other => Err(anyhow::anyhow!("unknown chore frequency: {}", other)),
        }
    }
}

/// Input shape for creating a chore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChore {
    pub title: String,
    pub description: String,
    pub value: f64,
    pub frequency: ChoreFrequency,
    pub day_of_week: Option<u8>,
}

impl NewChore {
    pub fn validate(&self) -> Result<(), ChoreValidationError> {
        if self.title.trim().is_empty() {
            return Err(ChoreValidationError::EmptyTitle);
        }
        if self.value < 0.0 {
            return Err(ChoreValidationError::NegativeValue);
        }
        // day_of_week is required iff the chore is weekly
        match (self.frequency, self.day_of_week) {
            (ChoreFrequency::Weekly, None) => Err(ChoreValidationError::MissingDayOfWeek),
            (ChoreFrequency::Weekly, Some(day)) if day > 6 => {
                Err(ChoreValidationError::InvalidDayOfWeek(day))
            }
            (ChoreFrequency::Weekly, Some(_)) => Ok(()),
            (_, Some(_)) => Err(ChoreValidationError::UnexpectedDayOfWeek),
            (_, None) => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChoreValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Chore value cannot be negative")]
    NegativeValue,
    #[error("Weekly chores require a day of week")]
    MissingDayOfWeek,
    #[error("Invalid day of week: {0}. Must be 0-6 (Sunday-Saturday)")]
    InvalidDayOfWeek(u8),
    #[error("Only weekly chores take a day of week")]
    UnexpectedDayOfWeek,
}

/// One instance of a chore assigned to a child.
///
/// Lifecycle: created `pending` (possibly many at once for a recurring range),
/// the child marks it `completed`, an admin marks it `approved`. The credit
/// happens exactly once, at approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreAssignment {
    pub id: String,
    pub child_id: String,
    pub chore_id: String,
    pub status: AssignmentStatus,
    pub due_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Shared by every assignment generated from one recurring-assign call, so
    /// a series can be identified (and cleaned up) as a unit.
    pub recurrence_source_id: Option<String>,
    pub completed_at: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Approved,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssignmentStatus::Pending),
            "completed" => Ok(AssignmentStatus::Completed),
            "approved" => Ok(AssignmentStatus::Approved),
            other => Err(anyhow::anyhow!("unknown assignment status: {}", other)),
        }
    }
}
