use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::domain::models::{Achievement, ACHIEVEMENTS};
use crate::domain::streak_service::StreakService;
use crate::storage::db::DbConnection;
use crate::storage::repositories::{
    ChoreRepository, ProposalRepository, RewardRepository, TransactionRepository,
};

/// Raw counts an achievement check runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AchievementInputs {
    pub chores_done: i64,
    pub rewards_claimed: i64,
    pub proposals_made: i64,
    pub lifetime_earned: f64,
    pub best_streak: u32,
}

fn unlocked(achievement: &Achievement, inputs: &AchievementInputs) -> bool {
    match achievement.id {
        "first_chore" => inputs.chores_done >= 1,
        "chores_10" => inputs.chores_done >= 10,
        "chores_25" => inputs.chores_done >= 25,
        "chores_50" => inputs.chores_done >= 50,
        "chores_100" => inputs.chores_done >= 100,
        "first_reward" => inputs.rewards_claimed >= 1,
        "first_proposal" => inputs.proposals_made >= 1,
        "earnings_10" => inputs.lifetime_earned >= 10.0,
        "earnings_50" => inputs.lifetime_earned >= 50.0,
        "earnings_100" => inputs.lifetime_earned >= 100.0,
        "streak_7" => inputs.best_streak >= 7,
        _ => false,
    }
}

/// Threshold achievements over aggregate history. Stateless: the unlocked set
/// is recomputed on every read from the logs, never stored.
#[derive(Clone)]
pub struct AchievementService {
    chores: ChoreRepository,
    rewards: RewardRepository,
    proposals: ProposalRepository,
    ledger: TransactionRepository,
    streaks: StreakService,
}

impl AchievementService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            chores: ChoreRepository::new(db.clone()),
            rewards: RewardRepository::new(db.clone()),
            proposals: ProposalRepository::new(db.clone()),
            ledger: TransactionRepository::new(db.clone()),
            streaks: StreakService::new(db),
        }
    }

    pub async fn unlocked_for_child(&self, child_id: &str) -> Result<Vec<Achievement>> {
        self.unlocked_for_child_at(child_id, Local::now().date_naive())
            .await
    }

    /// Date-injected core of [`AchievementService::unlocked_for_child`].
    pub async fn unlocked_for_child_at(
        &self,
        child_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Achievement>> {
        let inputs = AchievementInputs {
            chores_done: self.chores.count_done(child_id).await?,
            rewards_claimed: self.rewards.count_claims_for_child(child_id).await?,
            proposals_made: self.proposals.count_for_child(child_id).await?,
            lifetime_earned: self.ledger.earned_total(child_id).await?,
            best_streak: self.streaks.streak_for_child_at(child_id, today).await?.best,
        };
        Ok(ACHIEVEMENTS
            .iter()
            .filter(|achievement| unlocked(achievement, &inputs))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TransactionType;
    use crate::storage::repositories::ChildRepository;

    #[test]
    fn thresholds_are_inclusive() {
        let inputs = AchievementInputs {
            chores_done: 10,
            rewards_claimed: 0,
            proposals_made: 1,
            lifetime_earned: 50.0,
            best_streak: 6,
        };
        let ids: Vec<&str> = ACHIEVEMENTS
            .iter()
            .filter(|a| unlocked(a, &inputs))
            .map(|a| a.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "first_chore",
                "chores_10",
                "first_proposal",
                "earnings_10",
                "earnings_50",
            ]
        );
    }

    #[tokio::test]
    async fn test_achievements_reflect_current_history() {
        let db = DbConnection::init_test().await.expect("init test db");
        let service = AchievementService::new(db.clone());
        let children = ChildRepository::new(db.clone());
        let ledger = TransactionRepository::new(db.clone());
        let proposals = ProposalRepository::new(db);
        children.insert_child("c1", "Emma", "").await.expect("child");

        assert!(service
            .unlocked_for_child("c1")
            .await
            .expect("unlocked")
            .is_empty());

        ledger
            .credit("c1", 12.0, TransactionType::Earn, "Completed: Big job")
            .await
            .expect("credit");
        proposals
            .insert_proposal("c1", "Wash the car", "", 5.0)
            .await
            .expect("proposal");

        let ids: Vec<&str> = service
            .unlocked_for_child("c1")
            .await
            .expect("unlocked")
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["first_proposal", "earnings_10"]);
    }

    #[tokio::test]
    async fn test_spending_does_not_reduce_lifetime_earnings() {
        let db = DbConnection::init_test().await.expect("init test db");
        let service = AchievementService::new(db.clone());
        let children = ChildRepository::new(db.clone());
        let ledger = TransactionRepository::new(db);
        children.insert_child("c1", "Emma", "").await.expect("child");

        ledger
            .credit("c1", 10.0, TransactionType::Earn, "a")
            .await
            .expect("credit");
        ledger
            .debit("c1", 10.0, TransactionType::Spend, "b")
            .await
            .expect("debit");

        let ids: Vec<&str> = service
            .unlocked_for_child("c1")
            .await
            .expect("unlocked")
            .iter()
            .map(|a| a.id)
            .collect();
        assert!(ids.contains(&"earnings_10"));
    }
}
