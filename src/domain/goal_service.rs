use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::domain::models::SavingsGoal;
use crate::storage::db::DbConnection;
use crate::storage::repositories::{ChildRepository, GoalRepository};

/// A savings goal with its progress against the child's current balance.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal: SavingsGoal,
    pub progress: f64,
}

/// Savings goals: targets a child sets for themselves. Purely motivational;
/// nothing here moves money.
#[derive(Clone)]
pub struct GoalService {
    goals: GoalRepository,
    children: ChildRepository,
}

impl GoalService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            goals: GoalRepository::new(db.clone()),
            children: ChildRepository::new(db),
        }
    }

    /// Create a goal. Child only, under their own identity.
    pub async fn create_goal(
        &self,
        actor: &Actor,
        title: &str,
        target_amount: f64,
    ) -> Result<Option<SavingsGoal>> {
        let Some(child_id) = actor.signed_in_child_id() else {
            warn!(title, "create_goal refused: actor is not a child");
            return Ok(None);
        };
        SavingsGoal::validate_input(title, target_amount)?;
        let goal = self.goals.insert_goal(child_id, title, target_amount).await?;
        info!(goal_id = %goal.id, child_id, target_amount, "goal created");
        Ok(Some(goal))
    }

    /// A child's goals with progress derived from their current balance. The
    /// actor must cover the child.
    pub async fn goals_for_child(
        &self,
        actor: &Actor,
        child_id: &str,
    ) -> Result<Vec<GoalProgress>> {
        if !actor.can_act_on(child_id) {
            return Ok(Vec::new());
        }
        let balance = match self.children.get_child(child_id).await? {
            Some(child) => child.balance,
            None => return Ok(Vec::new()),
        };
        let goals = self.goals.goals_for_child(child_id).await?;
        Ok(goals
            .into_iter()
            .map(|goal| {
                let progress = goal.progress(balance);
                GoalProgress { goal, progress }
            })
            .collect())
    }

    /// Delete a goal. The owning child or an admin.
    pub async fn delete_goal(&self, actor: &Actor, goal_id: &str) -> Result<bool> {
        let Some(goal) = self.goals.get_goal(goal_id).await? else {
            return Ok(false);
        };
        if !actor.can_act_on(&goal.child_id) {
            warn!(goal_id, "delete_goal refused: actor cannot act on this child");
            return Ok(false);
        }
        self.goals.delete_goal(goal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TransactionType;
    use crate::storage::repositories::TransactionRepository;

    async fn setup_test() -> (GoalService, ChildRepository, TransactionRepository) {
        let db = DbConnection::init_test().await.expect("init test db");
        (
            GoalService::new(db.clone()),
            ChildRepository::new(db.clone()),
            TransactionRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_goal_progress_tracks_the_balance() {
        let (service, children, ledger) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");
        let owner = Actor::child("c1");

        service
            .create_goal(&owner, "New bike", 50.0)
            .await
            .expect("create")
            .expect("goal");
        ledger
            .credit("c1", 20.0, TransactionType::Earn, "Completed: Big job")
            .await
            .expect("credit");

        let goals = service.goals_for_child(&owner, "c1").await.expect("list");
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].progress, 0.4);
    }

    #[tokio::test]
    async fn test_goal_creation_is_child_only_and_validated() {
        let (service, children, _) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");

        assert!(service
            .create_goal(&Actor::admin(), "New bike", 50.0)
            .await
            .expect("create")
            .is_none());
        assert!(service
            .create_goal(&Actor::child("c1"), "New bike", 0.0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete_goal_owner_or_admin() {
        let (service, children, _) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");
        let owner = Actor::child("c1");
        let goal = service
            .create_goal(&owner, "New bike", 50.0)
            .await
            .expect("create")
            .expect("goal");

        assert!(!service
            .delete_goal(&Actor::child("c2"), &goal.id)
            .await
            .expect("delete"));
        assert!(service.delete_goal(&Actor::admin(), &goal.id).await.expect("delete"));
        assert!(service
            .goals_for_child(&owner, "c1")
            .await
            .expect("list")
            .is_empty());
    }
}
