use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::domain::models::{Reward, RewardClaim};
use crate::storage::db::DbConnection;
use crate::storage::repositories::RewardRepository;

/// Reward catalogue management and guarded claims.
#[derive(Clone)]
pub struct RewardService {
    rewards: RewardRepository,
}

impl RewardService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            rewards: RewardRepository::new(db),
        }
    }

    pub async fn create_reward(
        &self,
        actor: &Actor,
        title: &str,
        description: &str,
        cost: f64,
        icon: &str,
    ) -> Result<Option<Reward>> {
        if !actor.is_admin() {
            warn!(title, "create_reward refused: actor is not an admin");
            return Ok(None);
        }
        if cost < 0.0 {
            warn!(title, cost, "create_reward refused: negative cost");
            return Ok(None);
        }
        let reward = self
            .rewards
            .insert_reward(title, description, cost, icon)
            .await?;
        info!(reward_id = %reward.id, title, cost, "created reward");
        Ok(Some(reward))
    }

    pub async fn get_reward(&self, reward_id: &str) -> Result<Option<Reward>> {
        self.rewards.get_reward(reward_id).await
    }

    pub async fn list_rewards(&self) -> Result<Vec<Reward>> {
        self.rewards.list_rewards().await
    }

    pub async fn update_reward(&self, actor: &Actor, reward: &Reward) -> Result<bool> {
        if !actor.is_admin() {
            warn!(reward_id = %reward.id, "update_reward refused: actor is not an admin");
            return Ok(false);
        }
        self.rewards.update_reward(reward).await
    }

    pub async fn delete_reward(&self, actor: &Actor, reward_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(reward_id, "delete_reward refused: actor is not an admin");
            return Ok(false);
        }
        self.rewards.delete_reward(reward_id).await
    }

    /// Claim a reward for a child, debiting its cost. A child may claim only
    /// for themselves; an admin may claim on any child's behalf. Insufficient
    /// balance is a silent no-op.
    pub async fn claim_reward(
        &self,
        actor: &Actor,
        child_id: &str,
        reward_id: &str,
    ) -> Result<bool> {
        if !actor.can_act_on(child_id) {
            warn!(child_id, reward_id, "claim_reward refused: actor cannot act on this child");
            return Ok(false);
        }
        let Some(reward) = self.rewards.get_reward(reward_id).await? else {
            warn!(reward_id, "claim_reward refused: unknown reward");
            return Ok(false);
        };
        let claimed = self.rewards.claim(child_id, &reward).await?;
        if claimed {
            info!(child_id, reward_id, cost = reward.cost, "reward claimed");
        } else {
            info!(child_id, reward_id, "reward claim rejected by balance guard");
        }
        Ok(claimed)
    }

    pub async fn claim_count(&self, reward_id: &str) -> Result<i64> {
        self.rewards.claim_count(reward_id).await
    }

    pub async fn claims_for_child(&self, child_id: &str) -> Result<Vec<RewardClaim>> {
        self.rewards.claims_for_child(child_id).await
    }
}
