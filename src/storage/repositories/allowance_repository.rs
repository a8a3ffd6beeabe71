use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::models::{Child, TransactionType};
use crate::storage::db::DbConnection;
use crate::storage::repositories::child_repository::child_from_row;

/// Repository for the allowance scheduler's storage operations.
///
/// Both writers here are optimistic: the WHERE clause restates exactly what
/// the scheduler observed when it computed the deposit, so a concurrent run
/// (or a config change mid-pass) makes the update match zero rows and the
/// whole step becomes a no-op. At most one deposit can ever land per
/// elapsed-periods window.
#[derive(Clone)]
pub struct AllowanceRepository {
    db: DbConnection,
}

impl AllowanceRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Children the scheduler should look at: an active frequency and a
    /// positive amount.
    pub async fn children_with_active_allowance(&self) -> Result<Vec<Child>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM children
            WHERE allowance_frequency != 'none' AND allowance_amount > 0
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(child_from_row).collect()
    }

    /// Record a reference date for a child that has never been deposited to,
    /// without paying anything out.
    ///
    /// Guarded by `last_allowance_date IS NULL` so a second concurrent run
    /// cannot overwrite a date another writer just set.
    pub async fn seed_baseline(&self, child_id: &str, baseline: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET last_allowance_date = ?2, updated_at = datetime('now')
            WHERE id = ?1 AND last_allowance_date IS NULL
            "#,
        )
        .bind(child_id)
        .bind(baseline)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a catch-up deposit and advance `last_allowance_date` to `today`,
    /// logging one `allowance` transaction, all-or-nothing.
    ///
    /// The guard restates the three fields the deposit was computed from as
    /// they appeared on the `child` snapshot. `IS` is SQLite's null-safe
    /// equality, so a NULL `last_allowance_date` participates in the check
    /// like any other value.
    pub async fn apply_deposit(
        &self,
        child: &Child,
        total_deposit: f64,
        today: NaiveDate,
        description: &str,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE children
            SET balance = balance + ?2,
                last_allowance_date = ?3,
                updated_at = datetime('now')
            WHERE id = ?1
              AND last_allowance_date IS ?4
              AND allowance_amount = ?5
              AND allowance_frequency = ?6
            "#,
        )
        .bind(&child.id)
        .bind(total_deposit)
        .bind(today)
        .bind(child.last_allowance_date)
        .bind(child.allowance_amount)
        .bind(child.allowance_frequency.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (id, child_id, amount, type, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&child.id)
        .bind(total_deposit)
        .bind(TransactionType::Allowance.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
