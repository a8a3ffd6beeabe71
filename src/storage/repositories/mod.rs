//! Repository layer: all SQL lives here.
//!
//! Each repository is a thin `Clone` handle over the shared pool. Writers that
//! touch a balance are guarded compound operations; see the crate docs.

pub mod allowance_repository;
pub mod cash_out_repository;
pub mod child_repository;
pub mod chore_repository;
pub mod goal_repository;
pub mod proposal_repository;
pub mod reward_repository;
pub mod transaction_repository;

pub use allowance_repository::AllowanceRepository;
pub use cash_out_repository::CashOutRepository;
pub use child_repository::ChildRepository;
pub use chore_repository::{ChoreRepository, DayCompletion};
pub use goal_repository::GoalRepository;
pub use proposal_repository::ProposalRepository;
pub use reward_repository::RewardRepository;
pub use transaction_repository::TransactionRepository;
