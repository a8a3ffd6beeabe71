use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::{AllowanceFrequency, Child};
use crate::storage::db::DbConnection;

/// Repository for child rows and their allowance configuration.
///
/// Balance mutations do not live here; they go through the guarded compound
/// operations in the transaction repository so the ledger stays reconciled.
#[derive(Clone)]
pub struct ChildRepository {
    db: DbConnection,
}

pub(crate) fn child_from_row(row: &SqliteRow) -> Result<Child> {
    Ok(Child {
        id: row.get("id"),
        name: row.get("name"),
        avatar: row.get("avatar"),
        balance: row.get("balance"),
        allowance_amount: row.get("allowance_amount"),
        allowance_frequency: row.get::<String, _>("allowance_frequency").parse()?,
        allowance_start_date: row.get("allowance_start_date"),
        last_allowance_date: row.get("last_allowance_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl ChildRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a new child with a zero balance and no allowance.
    pub async fn insert_child(&self, id: &str, name: &str, avatar: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO children (id, name, avatar)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(avatar)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a child by ID
    pub async fn get_child(&self, child_id: &str) -> Result<Option<Child>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM children WHERE id = ?1
            "#,
        )
        .bind(child_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(child_from_row).transpose()
    }

    /// List all children ordered by name
    pub async fn list_children(&self) -> Result<Vec<Child>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM children ORDER BY name ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(child_from_row).collect()
    }

    /// Delete a child. Assignments, transactions, claims, cash-outs,
    /// proposals and goals cascade with it.
    pub async fn delete_child(&self, child_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM children WHERE id = ?1
            "#,
        )
        .bind(child_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Configure (or clear) a child's recurring allowance.
    ///
    /// Disabling zeroes the amount and clears both dates so stale state can
    /// never be mistaken for an active schedule. Enabling stamps
    /// `last_allowance_date` to the start date, which anchors the scheduler's
    /// first period without paying anything out.
    pub async fn set_allowance_config(
        &self,
        child_id: &str,
        amount: f64,
        frequency: AllowanceFrequency,
        start_date: Option<NaiveDate>,
    ) -> Result<bool> {
        let result = if frequency == AllowanceFrequency::None {
            sqlx::query(
                r#"
                UPDATE children
                SET allowance_amount = 0,
                    allowance_frequency = 'none',
                    allowance_start_date = NULL,
                    last_allowance_date = NULL,
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
            )
            .bind(child_id)
            .execute(self.db.pool())
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE children
                SET allowance_amount = ?2,
                    allowance_frequency = ?3,
                    allowance_start_date = ?4,
                    last_allowance_date = ?4,
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
            )
            .bind(child_id)
            .bind(amount)
            .bind(frequency.as_str())
            .bind(start_date)
            .execute(self.db.pool())
            .await?
        };
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> ChildRepository {
        let db = DbConnection::init_test().await.expect("init test db");
        ChildRepository::new(db)
    }

    #[tokio::test]
    async fn test_insert_and_get_child() {
        let repo = setup_test().await;
        repo.insert_child("c1", "Emma", "🦊").await.expect("insert");

        let child = repo.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.name, "Emma");
        assert_eq!(child.balance, 0.0);
        assert_eq!(child.allowance_frequency, AllowanceFrequency::None);
        assert!(child.allowance_start_date.is_none());
        assert!(child.last_allowance_date.is_none());

        assert!(repo.get_child("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_list_children_ordered_by_name() {
        let repo = setup_test().await;
        repo.insert_child("c1", "Zoe", "").await.expect("insert");
        repo.insert_child("c2", "Alex", "").await.expect("insert");

        let children = repo.list_children().await.expect("list");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "Alex");
        assert_eq!(children[1].name, "Zoe");
    }

    #[tokio::test]
    async fn test_set_allowance_config_enables_and_seeds_last_date() {
        let repo = setup_test().await;
        repo.insert_child("c1", "Emma", "").await.expect("insert");

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let updated = repo
            .set_allowance_config("c1", 5.0, AllowanceFrequency::Weekly, Some(start))
            .await
            .expect("configure");
        assert!(updated);

        let child = repo.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.allowance_amount, 5.0);
        assert_eq!(child.allowance_frequency, AllowanceFrequency::Weekly);
        assert_eq!(child.allowance_start_date, Some(start));
        assert_eq!(child.last_allowance_date, Some(start));
    }

    #[tokio::test]
    async fn test_set_allowance_config_none_clears_everything() {
        let repo = setup_test().await;
        repo.insert_child("c1", "Emma", "").await.expect("insert");

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        repo.set_allowance_config("c1", 5.0, AllowanceFrequency::Weekly, Some(start))
            .await
            .expect("configure");
        repo.set_allowance_config("c1", 99.0, AllowanceFrequency::None, None)
            .await
            .expect("disable");

        let child = repo.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.allowance_amount, 0.0);
        assert_eq!(child.allowance_frequency, AllowanceFrequency::None);
        assert!(child.allowance_start_date.is_none());
        assert!(child.last_allowance_date.is_none());
        assert!(!child.has_active_allowance());
    }

    #[tokio::test]
    async fn test_unknown_child_is_a_noop() {
        let repo = setup_test().await;
        assert!(!repo.delete_child("missing").await.expect("delete"));
        assert!(!repo
            .set_allowance_config("missing", 5.0, AllowanceFrequency::Weekly, None)
            .await
            .expect("configure"));
    }
}
