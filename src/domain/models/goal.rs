//! Domain model for savings goals.
use serde::{Deserialize, Serialize};

/// A target a child is saving towards. Progress is derived from the child's
/// current balance on every read; goals never touch the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: String,
    pub child_id: String,
    pub title: String,
    pub target_amount: f64,
    pub created_at: String,
}

impl SavingsGoal {
    /// Fraction of the target covered by `balance`, clamped to 0..=1.
    pub fn progress(&self, balance: f64) -> f64 {
        if self.target_amount <= 0.0 {
            return 1.0;
        }
        (balance / self.target_amount).clamp(0.0, 1.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GoalValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Target amount must be positive")]
    NonPositiveTargetAmount,
}

impl SavingsGoal {
    pub fn validate_input(title: &str, target_amount: f64) -> Result<(), GoalValidationError> {
        if title.trim().is_empty() {
            return Err(GoalValidationError::EmptyTitle);
        }
        if target_amount <= 0.0 {
            return Err(GoalValidationError::NonPositiveTargetAmount);
        }
        Ok(())
    }
}
