//! # Chore Tracker Core
//!
//! Business logic for a household chore-and-allowance tracker: parents define
//! chores, rewards and allowance schedules; children complete chores, propose
//! new ones, accumulate balance and spend it.
//!
//! The crate is a library of operations, not a network service. Callers (web
//! handlers, a cron-style trigger) construct the services in [`domain`] over a
//! [`storage::DbConnection`] and invoke one operation per request.
//!
//! The load-bearing design rule: every balance mutation is a guarded compound
//! statement, a conditional `UPDATE` plus its dependent `INSERT`s executed in
//! one storage transaction, with the precondition expressed in the `UPDATE`'s
//! `WHERE` clause. The guard condition *is* the concurrency control; there are
//! no separate locks and no read-then-write windows.
//!
//! Business-rule rejections (insufficient balance, wrong source state, actor
//! without the required capability, unknown ids) are silent no-ops surfaced as
//! `Ok(false)` / `Ok(None)` / empty collections. `Err` is reserved for storage
//! failures and invalid input shapes.

pub mod auth;
pub mod domain;
pub mod storage;

pub use auth::Actor;
pub use domain::{
    AchievementService, AllowanceService, CashOutService, ChildService, ChoreService,
    GoalService, LedgerService, ProposalService, RewardService, SchedulerSummary, Streak,
    StreakService,
};
pub use storage::DbConnection;
