use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::{Transaction, TransactionType};
use crate::storage::db::DbConnection;

/// Repository for the ledger: the append-only transaction log plus the cached
/// per-child balance.
///
/// Every writer here is a guarded compound operation: one conditional UPDATE
/// against `children` and the dependent INSERT into `transactions`, executed
/// in a single storage transaction. The precondition lives in the UPDATE's
/// WHERE clause and is decided by `rows_affected`, never by a prior read, so
/// two racing writers cannot both get past a guard.
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

pub(crate) fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    Ok(Transaction {
        id: row.get("id"),
        child_id: row.get("child_id"),
        amount: row.get("amount"),
        transaction_type: row.get::<String, _>("type").parse()?,
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Unconditionally add `amount` to the child's balance and log it.
    ///
    /// Returns false (with nothing written) when the child does not exist.
    pub async fn credit(
        &self,
        child_id: &str,
        amount: f64,
        kind: TransactionType,
        description: &str,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE children
            SET balance = balance + ?2, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(child_id)
        .bind(amount)
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
        .bind(child_id)
        .bind(amount)
        .bind(kind.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Subtract `amount` from the child's balance, guarded by
    /// `balance >= amount`. On guard failure nothing is written: no balance
    /// change and no log entry.
    pub async fn debit(
        &self,
        child_id: &str,
        amount: f64,
        kind: TransactionType,
        description: &str,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE children
            SET balance = balance - ?2, updated_at = datetime('now')
            WHERE id = ?1 AND balance >= ?2
            "#,
        )
        .bind(child_id)
        .bind(amount)
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
        .bind(child_id)
        .bind(-amount)
        .bind(kind.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Overwrite the child's balance and log the delta as an `admin`
    /// transaction, keeping the ledger reconciled even though no discrete
    /// event occurred.
    ///
    /// The delta entry goes in first via INSERT..SELECT against the
    /// pre-update balance, so the transaction opens with a write instead of a
    /// read it would have to upgrade.
    pub async fn set_balance(
        &self,
        child_id: &str,
        new_balance: f64,
        description: &str,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let logged = sqlx::query(
            r#"
            INSERT INTO transactions (id, child_id, amount, type, description)
            SELECT ?1, id, ?3 - balance, ?4, ?5 FROM children WHERE id = ?2
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(child_id)
        .bind(new_balance)
        .bind(TransactionType::Admin.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await?;
        if logged.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE children
            SET balance = ?2, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(child_id)
        .bind(new_balance)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Delete a transaction and apply the inverse delta to the balance, so
    /// removing an erroneous entry keeps the cached total reconciled.
    ///
    /// Returns the owning child's id when something was deleted. The reversal
    /// UPDATE opens the transaction and resolves the target through
    /// subqueries, so a racing deleter blocks on it and then finds nothing to
    /// reverse.
    pub async fn delete_reversing(&self, transaction_id: &str) -> Result<Option<String>> {
        let mut tx = self.db.pool().begin().await?;

        let reversed = sqlx::query(
            r#"
            UPDATE children
            SET balance = balance - (SELECT amount FROM transactions WHERE id = ?1),
                updated_at = datetime('now')
            WHERE id = (SELECT child_id FROM transactions WHERE id = ?1)
            RETURNING id
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(reversed) = reversed else {
            tx.rollback().await?;
            return Ok(None);
        };
        let child_id: String = reversed.get("id");

        sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(child_id))
    }

    /// Zero every balance and clear the whole log, atomically.
    pub async fn reset_all(&self) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("UPDATE children SET balance = 0, updated_at = datetime('now')")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM transactions")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = ?1")
            .bind(transaction_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    /// List a child's transactions, newest first.
    pub async fn list_for_child(&self, child_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    /// Sum of a child's log entries. Must always equal the cached balance.
    pub async fn ledger_sum(&self, child_id: &str) -> Result<f64> {
        let sum: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE child_id = ?1")
                .bind(child_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(sum)
    }

    /// Lifetime earnings: the sum of all positive entries.
    pub async fn earned_total(&self, child_id: &str) -> Result<f64> {
        let sum: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE child_id = ?1 AND amount > 0",
        )
        .bind(child_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::child_repository::ChildRepository;

    async fn setup_test() -> (TransactionRepository, ChildRepository) {
        let db = DbConnection::init_test().await.expect("init test db");
        (
            TransactionRepository::new(db.clone()),
            ChildRepository::new(db),
        )
    }

    async fn current_balance(children: &ChildRepository, child_id: &str) -> f64 {
        children
            .get_child(child_id)
            .await
            .expect("get child")
            .expect("child exists")
            .balance
    }

    #[tokio::test]
    async fn test_credit_updates_balance_and_logs() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");

        assert!(ledger
            .credit("c1", 2.5, TransactionType::Earn, "Completed: Dishes")
            .await
            .expect("credit"));

        assert_eq!(current_balance(&children, "c1").await, 2.5);
        let log = ledger.list_for_child("c1").await.expect("list");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].amount, 2.5);
        assert_eq!(log[0].transaction_type, TransactionType::Earn);
        assert_eq!(log[0].description, "Completed: Dishes");
    }

    #[tokio::test]
    async fn test_credit_unknown_child_writes_nothing() {
        let (ledger, _children) = setup_test().await;
        assert!(!ledger
            .credit("missing", 2.5, TransactionType::Earn, "x")
            .await
            .expect("credit"));
    }

    #[tokio::test]
    async fn test_debit_guard_rejects_insufficient_balance() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");
        ledger
            .credit("c1", 3.0, TransactionType::Bonus, "Pocket money")
            .await
            .expect("credit");

        // More than the balance: whole operation is a no-op
        assert!(!ledger
            .debit("c1", 5.0, TransactionType::Spend, "Too expensive")
            .await
            .expect("debit"));
        assert_eq!(current_balance(&children, "c1").await, 3.0);
        assert_eq!(ledger.list_for_child("c1").await.expect("list").len(), 1);

        // Exactly the balance: allowed
        assert!(ledger
            .debit("c1", 3.0, TransactionType::Spend, "All of it")
            .await
            .expect("debit"));
        assert_eq!(current_balance(&children, "c1").await, 0.0);
    }

    #[tokio::test]
    async fn test_set_balance_logs_the_delta() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");
        ledger
            .credit("c1", 4.0, TransactionType::Bonus, "Start")
            .await
            .expect("credit");

        assert!(ledger
            .set_balance("c1", 10.0, "Admin adjustment: balance set to £10.00")
            .await
            .expect("set"));

        assert_eq!(current_balance(&children, "c1").await, 10.0);
        let log = ledger.list_for_child("c1").await.expect("list");
        let admin_entry = log
            .iter()
            .find(|t| t.transaction_type == TransactionType::Admin)
            .expect("admin entry");
        assert_eq!(admin_entry.amount, 6.0);
        assert_eq!(ledger.ledger_sum("c1").await.expect("sum"), 10.0);
    }

    #[tokio::test]
    async fn test_delete_reversing_restores_balance() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");
        ledger
            .credit("c1", 4.0, TransactionType::Bonus, "Oops, wrong child")
            .await
            .expect("credit");
        let txn = &ledger.list_for_child("c1").await.expect("list")[0];

        let child_id = ledger
            .delete_reversing(&txn.id)
            .await
            .expect("delete")
            .expect("deleted");
        assert_eq!(child_id, "c1");
        assert_eq!(current_balance(&children, "c1").await, 0.0);
        assert!(ledger.list_for_child("c1").await.expect("list").is_empty());

        assert!(ledger
            .delete_reversing("missing")
            .await
            .expect("delete")
            .is_none());
    }

    #[tokio::test]
    async fn test_concurrent_deletes_reverse_once() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");
        ledger
            .credit("c1", 4.0, TransactionType::Bonus, "Oops")
            .await
            .expect("credit");
        let txn_id = ledger.list_for_child("c1").await.expect("list")[0].id.clone();

        let (first, second) = tokio::join!(
            ledger.delete_reversing(&txn_id),
            ledger.delete_reversing(&txn_id)
        );
        // Exactly one deleter wins; the loser gets a clean no-op
        let outcomes = [first.expect("delete"), second.expect("delete")];
        assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);

        assert_eq!(current_balance(&children, "c1").await, 0.0);
        assert!(ledger.list_for_child("c1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_ledger_reconciles_after_mixed_operations() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");

        ledger
            .credit("c1", 10.0, TransactionType::Allowance, "Allowance (weekly)")
            .await
            .expect("credit");
        ledger
            .debit("c1", 4.0, TransactionType::Spend, "Claimed reward: Comic")
            .await
            .expect("debit");
        ledger
            .debit("c1", 100.0, TransactionType::Spend, "Rejected")
            .await
            .expect("debit");
        ledger
            .credit("c1", 1.5, TransactionType::Earn, "Completed: Dishes")
            .await
            .expect("credit");
        ledger.set_balance("c1", 5.0, "Override").await.expect("set");

        let balance = current_balance(&children, "c1").await;
        let sum = ledger.ledger_sum("c1").await.expect("sum");
        assert_eq!(balance, sum);
        assert_eq!(balance, 5.0);
    }

    #[tokio::test]
    async fn test_earned_total_counts_only_credits() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");

        ledger
            .credit("c1", 10.0, TransactionType::Earn, "a")
            .await
            .expect("credit");
        ledger
            .debit("c1", 4.0, TransactionType::Spend, "b")
            .await
            .expect("debit");

        assert_eq!(ledger.earned_total("c1").await.expect("total"), 10.0);
    }

    #[tokio::test]
    async fn test_reset_all_clears_balances_and_log() {
        let (ledger, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("insert");
        children.insert_child("c2", "Alex", "").await.expect("insert");
        ledger
            .credit("c1", 10.0, TransactionType::Earn, "a")
            .await
            .expect("credit");
        ledger
            .credit("c2", 3.0, TransactionType::Bonus, "b")
            .await
            .expect("credit");

        ledger.reset_all().await.expect("reset");

        assert_eq!(current_balance(&children, "c1").await, 0.0);
        assert_eq!(current_balance(&children, "c2").await, 0.0);
        assert!(ledger.list_for_child("c1").await.expect("list").is_empty());
        assert!(ledger.list_for_child("c2").await.expect("list").is_empty());
    }
}
