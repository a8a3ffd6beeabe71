use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::{Reward, RewardClaim, TransactionType};
use crate::storage::db::DbConnection;

/// Repository for rewards and claims.
///
/// Claiming is the spend-side compound writer: a debit guarded by sufficient
/// balance, the claim row, and the `spend` log entry land together or not at
/// all.
#[derive(Clone)]
pub struct RewardRepository {
    db: DbConnection,
}

fn reward_from_row(row: &SqliteRow) -> Reward {
    Reward {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        cost: row.get("cost"),
        icon: row.get("icon"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn claim_from_row(row: &SqliteRow) -> RewardClaim {
    RewardClaim {
        id: row.get("id"),
        child_id: row.get("child_id"),
        reward_id: row.get("reward_id"),
        created_at: row.get("created_at"),
    }
}

impl RewardRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn insert_reward(
        &self,
        title: &str,
        description: &str,
        cost: f64,
        icon: &str,
    ) -> Result<Reward> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO rewards (id, title, description, cost, icon)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(title)
        .bind(description)
        .bind(cost)
        .bind(icon)
        .execute(self.db.pool())
        .await?;

        self.get_reward(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("reward vanished after insert: {}", id))
    }

    pub async fn get_reward(&self, reward_id: &str) -> Result<Option<Reward>> {
        let row = sqlx::query("SELECT * FROM rewards WHERE id = ?1")
            .bind(reward_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(reward_from_row))
    }

    pub async fn list_rewards(&self) -> Result<Vec<Reward>> {
        let rows = sqlx::query("SELECT * FROM rewards ORDER BY title ASC")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(reward_from_row).collect())
    }

    pub async fn update_reward(&self, reward: &Reward) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rewards
            SET title = ?2, description = ?3, cost = ?4, icon = ?5, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(&reward.id)
        .bind(&reward.title)
        .bind(&reward.description)
        .bind(reward.cost)
        .bind(&reward.icon)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_reward(&self, reward_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rewards WHERE id = ?1")
            .bind(reward_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Debit the reward's cost, insert the claim and log the spend, guarded
    /// by sufficient balance. On guard failure nothing is written.
    pub async fn claim(&self, child_id: &str, reward: &Reward) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let debited = sqlx::query(
            r#"
            UPDATE children
            SET balance = balance - ?2, updated_at = datetime('now')
            WHERE id = ?1 AND balance >= ?2
            "#,
        )
        .bind(child_id)
        .bind(reward.cost)
        .execute(&mut *tx)
        .await?;
        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO reward_claims (id, child_id, reward_id)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(child_id)
        .bind(&reward.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, child_id, amount, type, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(child_id)
        .bind(-reward.cost)
        .bind(TransactionType::Spend.as_str())
        .bind(format!("Claimed reward: {}", reward.title))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn claim_count(&self, reward_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reward_claims WHERE reward_id = ?1")
                .bind(reward_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }

    pub async fn claims_for_child(&self, child_id: &str) -> Result<Vec<RewardClaim>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM reward_claims
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(claim_from_row).collect())
    }

    pub async fn count_claims_for_child(&self, child_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reward_claims WHERE child_id = ?1")
                .bind(child_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }
}
