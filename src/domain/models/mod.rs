//! Typed domain entities.
//!
//! Statuses and frequencies are explicit enums with `as_str`/`FromStr`
//! bridges to their TEXT storage representation, so transition legality is an
//! exhaustive-match concern rather than scattered string comparisons.

pub mod achievement;
pub mod cash_out;
pub mod child;
pub mod chore;
pub mod goal;
pub mod proposal;
pub mod reward;
pub mod transaction;

pub use achievement::{Achievement, ACHIEVEMENTS};
pub use cash_out::{CashOutRequest, CashOutStatus};
pub use child::{AllowanceFrequency, Child};
pub use chore::{
    AssignmentStatus, Chore, ChoreAssignment, ChoreFrequency, ChoreValidationError, NewChore,
};
pub use goal::{GoalValidationError, SavingsGoal};
pub use proposal::{ChoreProposal, ProposalStatus};
pub use reward::{Reward, RewardClaim};
pub use transaction::{Transaction, TransactionType};
