//! SQLite-backed storage.

pub mod db;
pub mod repositories;

pub use db::DbConnection;
pub use repositories::{
    AllowanceRepository, CashOutRepository, ChildRepository, ChoreRepository, DayCompletion,
    GoalRepository, ProposalRepository, RewardRepository, TransactionRepository,
};
