use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::{CashOutRequest, TransactionType};
use crate::storage::db::DbConnection;

/// Repository for cash-out requests.
///
/// Escrow semantics: the amount leaves the balance at request time, guarded
/// by sufficient funds. Approval is only a status flip; rejection refunds the
/// held amount. Both resolutions are guarded on `status = 'pending'` so a
/// request can never be resolved twice.
#[derive(Clone)]
pub struct CashOutRepository {
    db: DbConnection,
}

fn request_from_row(row: &SqliteRow) -> Result<CashOutRequest> {
    Ok(CashOutRequest {
        id: row.get("id"),
        child_id: row.get("child_id"),
        amount: row.get("amount"),
        status: row.get::<String, _>("status").parse()?,
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    })
}

impl CashOutRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Guarded escrow debit plus the pending request row plus the `cash_out`
    /// log entry, all-or-nothing.
    pub async fn request(&self, child_id: &str, amount: f64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let debited = sqlx::query(
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
        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO cash_out_requests (id, child_id, amount)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(child_id)
        .bind(amount)
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
        .bind(-amount)
        .bind(TransactionType::CashOut.as_str())
        .bind(format!("Cash-out request: £{:.2}", amount))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// `pending -> approved`. The money already left at request time, so this
    /// only records that the transfer was carried out.
    pub async fn approve(&self, request_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_out_requests
            SET status = 'approved', resolved_at = datetime('now')
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(request_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `pending -> rejected` plus the refund credit reversing the escrow,
    /// all-or-nothing. The guarded status flip is the transaction's first
    /// statement; a racing resolver blocks on it and then matches nothing.
    /// Returns the owning child's id when the rejection applied.
    pub async fn reject(&self, request_id: &str) -> Result<Option<String>> {
        let mut tx = self.db.pool().begin().await?;

        let resolved = sqlx::query(
            r#"
            UPDATE cash_out_requests
            SET status = 'rejected', resolved_at = datetime('now')
            WHERE id = ?1 AND status = 'pending'
            RETURNING child_id, amount
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(resolved) = resolved else {
            tx.rollback().await?;
            return Ok(None);
        };
        let child_id: String = resolved.get("child_id");
        let amount: f64 = resolved.get("amount");

        sqlx::query(
            r#"
            UPDATE children
            SET balance = balance + ?2, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(&child_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, child_id, amount, type, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&child_id)
        .bind(amount)
        .bind(TransactionType::Refund.as_str())
        .bind(format!("Cash-out rejected: £{:.2} refunded", amount))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(child_id))
    }

    pub async fn get_request(&self, request_id: &str) -> Result<Option<CashOutRequest>> {
        let row = sqlx::query("SELECT * FROM cash_out_requests WHERE id = ?1")
            .bind(request_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(request_from_row).transpose()
    }

    pub async fn requests_for_child(&self, child_id: &str) -> Result<Vec<CashOutRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM cash_out_requests
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(request_from_row).collect()
    }

    pub async fn list_pending(&self) -> Result<Vec<CashOutRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM cash_out_requests
            WHERE status = 'pending'
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(request_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CashOutStatus;
    use crate::storage::repositories::child_repository::ChildRepository;
    use crate::storage::repositories::transaction_repository::TransactionRepository;

    async fn setup_test() -> (CashOutRepository, ChildRepository, TransactionRepository) {
        let db = DbConnection::init_test().await.expect("init test db");
        (
            CashOutRepository::new(db.clone()),
            ChildRepository::new(db.clone()),
            TransactionRepository::new(db),
        )
    }

    async fn funded_child(children: &ChildRepository, ledger: &TransactionRepository) {
        children.insert_child("c1", "Emma", "").await.expect("child");
        ledger
            .credit("c1", 10.0, TransactionType::Bonus, "Start")
            .await
            .expect("credit");
    }

    #[tokio::test]
    async fn test_request_escrows_immediately() {
        let (cash_outs, children, ledger) = setup_test().await;
        funded_child(&children, &ledger).await;

        assert!(cash_outs.request("c1", 6.0).await.expect("request"));

        let child = children.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.balance, 4.0);
        let pending = cash_outs.list_pending().await.expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, 6.0);
        assert_eq!(pending[0].status, CashOutStatus::Pending);
        assert_eq!(ledger.ledger_sum("c1").await.expect("sum"), child.balance);
    }

    #[tokio::test]
    async fn test_request_guard_rejects_overdraw() {
        let (cash_outs, children, ledger) = setup_test().await;
        funded_child(&children, &ledger).await;

        assert!(!cash_outs.request("c1", 11.0).await.expect("request"));

        let child = children.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.balance, 10.0);
        assert!(cash_outs.list_pending().await.expect("pending").is_empty());
    }

    #[tokio::test]
    async fn test_approve_finalizes_without_balance_change() {
        let (cash_outs, children, ledger) = setup_test().await;
        funded_child(&children, &ledger).await;
        cash_outs.request("c1", 6.0).await.expect("request");
        let request = cash_outs.requests_for_child("c1").await.expect("list")[0].clone();

        assert!(cash_outs.approve(&request.id).await.expect("approve"));
        // Already resolved: second approval is a no-op
        assert!(!cash_outs.approve(&request.id).await.expect("approve"));

        let child = children.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.balance, 4.0);
        let resolved = cash_outs
            .get_request(&request.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(resolved.status, CashOutStatus::Approved);
        assert!(resolved.resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_rejects_refund_once() {
        let (cash_outs, children, ledger) = setup_test().await;
        funded_child(&children, &ledger).await;
        cash_outs.request("c1", 6.0).await.expect("request");
        let request = cash_outs.requests_for_child("c1").await.expect("list")[0].clone();

        let (first, second) = tokio::join!(
            cash_outs.reject(&request.id),
            cash_outs.reject(&request.id)
        );
        // Exactly one resolver wins; the loser gets a clean no-op
        let outcomes = [first.expect("reject"), second.expect("reject")];
        assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);

        let child = children.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.balance, 10.0);
        let refunds = ledger
            .list_for_child("c1")
            .await
            .expect("list")
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Refund)
            .count();
        assert_eq!(refunds, 1);
    }

    #[tokio::test]
    async fn test_reject_refunds_the_escrow_exactly() {
        let (cash_outs, children, ledger) = setup_test().await;
        funded_child(&children, &ledger).await;
        cash_outs.request("c1", 6.0).await.expect("request");
        let request = cash_outs.requests_for_child("c1").await.expect("list")[0].clone();

        assert_eq!(
            cash_outs.reject(&request.id).await.expect("reject"),
            Some("c1".to_string())
        );
        // Net zero: escrow then refund
        let child = children.get_child("c1").await.expect("get").expect("exists");
        assert_eq!(child.balance, 10.0);
        assert_eq!(ledger.ledger_sum("c1").await.expect("sum"), 10.0);

        // A rejected request cannot be approved or re-rejected
        assert!(!cash_outs.approve(&request.id).await.expect("approve"));
        assert!(cash_outs.reject(&request.id).await.expect("reject").is_none());
        let log = ledger.list_for_child("c1").await.expect("list");
        let refunds = log
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Refund)
            .count();
        assert_eq!(refunds, 1);
    }
}
