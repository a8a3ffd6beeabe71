//! Domain models for rewards and claims.
use serde::{Deserialize, Serialize};

/// Something a child can spend balance on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cost: f64,
    pub icon: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A claimed reward. Created atomically with the `spend` debit; a claim row
/// without its matching transaction cannot exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardClaim {
    pub id: String,
    pub child_id: String,
    pub reward_id: String,
    pub created_at: String,
}
