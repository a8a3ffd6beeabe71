//! Domain services: one per aggregate, each a thin capability-checking layer
//! over the repositories. Services hold only repository handles and are cheap
//! to clone.

pub mod models;

pub mod achievement_service;
pub mod allowance_service;
pub mod cash_out_service;
pub mod child_service;
pub mod chore_service;
pub mod goal_service;
pub mod ledger_service;
pub mod proposal_service;
pub mod reward_service;
pub mod streak_service;

pub use achievement_service::AchievementService;
pub use allowance_service::{AllowanceService, SchedulerSummary};
pub use cash_out_service::CashOutService;
pub use child_service::ChildService;
pub use chore_service::{recurrence_dates, ChoreService};
pub use goal_service::{GoalProgress, GoalService};
pub use ledger_service::LedgerService;
pub use proposal_service::ProposalService;
pub use reward_service::RewardService;
pub use streak_service::{compute_streak, Streak, StreakService};
