use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::SavingsGoal;
use crate::storage::db::DbConnection;

/// Repository for savings goals. Plain CRUD; goals never touch the ledger.
#[derive(Clone)]
pub struct GoalRepository {
    db: DbConnection,
}

fn goal_from_row(row: &SqliteRow) -> SavingsGoal {
    SavingsGoal {
        id: row.get("id"),
        child_id: row.get("child_id"),
        title: row.get("title"),
        target_amount: row.get("target_amount"),
        created_at: row.get("created_at"),
    }
}

impl GoalRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn insert_goal(
        &self,
        child_id: &str,
        title: &str,
        target_amount: f64,
    ) -> Result<SavingsGoal> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO savings_goals (id, child_id, title, target_amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&id)
        .bind(child_id)
        .bind(title)
        .bind(target_amount)
        .execute(self.db.pool())
        .await?;

        self.get_goal(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("goal vanished after insert: {}", id))
    }

    pub async fn get_goal(&self, goal_id: &str) -> Result<Option<SavingsGoal>> {
        let row = sqlx::query("SELECT * FROM savings_goals WHERE id = ?1")
            .bind(goal_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(goal_from_row))
    }

    pub async fn goals_for_child(&self, child_id: &str) -> Result<Vec<SavingsGoal>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM savings_goals
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(goal_from_row).collect())
    }

    pub async fn delete_goal(&self, goal_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM savings_goals WHERE id = ?1")
            .bind(goal_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::child_repository::ChildRepository;

    #[tokio::test]
    async fn test_goal_crud() {
        let db = DbConnection::init_test().await.expect("init test db");
        let goals = GoalRepository::new(db.clone());
        let children = ChildRepository::new(db);
        children.insert_child("c1", "Emma", "").await.expect("child");

        let goal = goals
            .insert_goal("c1", "New bike", 50.0)
            .await
            .expect("insert");
        assert_eq!(goal.target_amount, 50.0);

        let listed = goals.goals_for_child("c1").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "New bike");

        assert!(goals.delete_goal(&goal.id).await.expect("delete"));
        assert!(goals.goals_for_child("c1").await.expect("list").is_empty());
        assert!(!goals.delete_goal(&goal.id).await.expect("delete"));
    }
}
