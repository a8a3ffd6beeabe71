use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::domain::models::{Transaction, TransactionType};
use crate::storage::db::DbConnection;
use crate::storage::repositories::TransactionRepository;

/// Admin-facing ledger operations: manual transactions, balance overrides and
/// reversals.
///
/// Normal earning and spending never comes through here; it happens inside the
/// chore, reward, cash-out and allowance flows. This service exists for the
/// out-of-band corrections a parent occasionally needs.
#[derive(Clone)]
pub struct LedgerService {
    ledger: TransactionRepository,
}

impl LedgerService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            ledger: TransactionRepository::new(db),
        }
    }

    /// Record a manual transaction. Admin only.
    ///
    /// The sign is normalised from the kind: spends and deductions always land
    /// negative, everything else positive, regardless of the sign the caller
    /// passed.
    pub async fn add_transaction(
        &self,
        actor: &Actor,
        child_id: &str,
        amount: f64,
        kind: TransactionType,
        description: &str,
    ) -> Result<bool> {
        if !actor.is_admin() {
            warn!(child_id, "add_transaction refused: actor is not an admin");
            return Ok(false);
        }
        let signed = kind.signed_amount(amount);
        let applied = if signed < 0.0 {
            self.ledger.debit(child_id, -signed, kind, description).await?
        } else {
            self.ledger.credit(child_id, signed, kind, description).await?
        };
        if applied {
            info!(child_id, kind = kind.as_str(), amount = signed, "manual transaction applied");
        }
        Ok(applied)
    }

    /// Overwrite a child's balance, logging the delta so the ledger still
    /// reconciles. Admin only.
    pub async fn set_balance(
        &self,
        actor: &Actor,
        child_id: &str,
        new_balance: f64,
    ) -> Result<bool> {
        if !actor.is_admin() {
            warn!(child_id, "set_balance refused: actor is not an admin");
            return Ok(false);
        }
        let description = format!("Admin adjustment: balance set to £{:.2}", new_balance);
        let applied = self
            .ledger
            .set_balance(child_id, new_balance, &description)
            .await?;
        if applied {
            info!(child_id, new_balance, "balance overridden");
        }
        Ok(applied)
    }

    /// Delete a transaction and reverse its effect on the balance. Admin only.
    pub async fn delete_transaction(&self, actor: &Actor, transaction_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(transaction_id, "delete_transaction refused: actor is not an admin");
            return Ok(false);
        }
        match self.ledger.delete_reversing(transaction_id).await? {
            Some(child_id) => {
                info!(transaction_id, child_id = %child_id, "transaction deleted and reversed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Zero every balance and clear the whole transaction log. Admin only.
    pub async fn reset_all_balances(&self, actor: &Actor) -> Result<bool> {
        if !actor.is_admin() {
            warn!("reset_all_balances refused: actor is not an admin");
            return Ok(false);
        }
        self.ledger.reset_all().await?;
        info!("all balances and transactions reset");
        Ok(true)
    }

    pub async fn list_transactions(&self, child_id: &str) -> Result<Vec<Transaction>> {
        self.ledger.list_for_child(child_id).await
    }

    /// Recompute the balance from the log alone; must equal the cached value.
    pub async fn balance_from_ledger(&self, child_id: &str) -> Result<f64> {
        self.ledger.ledger_sum(child_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::ChildRepository;

    async fn setup_test() -> (LedgerService, ChildRepository) {
        let db = DbConnection::init_test().await.expect("init test db");
        (LedgerService::new(db.clone()), ChildRepository::new(db))
    }

    #[tokio::test]
    async fn test_add_transaction_normalises_sign_by_kind() {
        let (service, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");
        let admin = Actor::admin();

        assert!(service
            .add_transaction(&admin, "c1", -3.0, TransactionType::Bonus, "Holiday bonus")
            .await
            .expect("add"));
        assert!(service
            .add_transaction(&admin, "c1", 1.0, TransactionType::Deduction, "Broken window")
            .await
            .expect("add"));

        let log = service.list_transactions("c1").await.expect("list");
        let bonus = log
            .iter()
            .find(|t| t.transaction_type == TransactionType::Bonus)
            .expect("bonus");
        let deduction = log
            .iter()
            .find(|t| t.transaction_type == TransactionType::Deduction)
            .expect("deduction");
        assert_eq!(bonus.amount, 3.0);
        assert_eq!(deduction.amount, -1.0);
        assert_eq!(service.balance_from_ledger("c1").await.expect("sum"), 2.0);
    }

    #[tokio::test]
    async fn test_ledger_operations_require_admin() {
        let (service, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");
        let child_actor = Actor::child("c1");

        assert!(!service
            .add_transaction(&child_actor, "c1", 100.0, TransactionType::Bonus, "Nice try")
            .await
            .expect("add"));
        assert!(!service
            .set_balance(&child_actor, "c1", 100.0)
            .await
            .expect("set"));
        assert!(!service
            .reset_all_balances(&child_actor)
            .await
            .expect("reset"));
        assert!(service.list_transactions("c1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_set_balance_describes_the_override() {
        let (service, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");

        assert!(service
            .set_balance(&Actor::admin(), "c1", 12.5)
            .await
            .expect("set"));

        let log = service.list_transactions("c1").await.expect("list");
        assert_eq!(log[0].description, "Admin adjustment: balance set to £12.50");
        assert_eq!(log[0].amount, 12.5);
    }

    #[tokio::test]
    async fn test_delete_transaction_reverses() {
        let (service, children) = setup_test().await;
        children.insert_child("c1", "Emma", "").await.expect("child");
        service
            .add_transaction(&Actor::admin(), "c1", 4.0, TransactionType::Bonus, "Oops")
            .await
            .expect("add");
        let txn_id = service.list_transactions("c1").await.expect("list")[0].id.clone();

        assert!(service
            .delete_transaction(&Actor::admin(), &txn_id)
            .await
            .expect("delete"));
        assert_eq!(service.balance_from_ledger("c1").await.expect("sum"), 0.0);
        assert!(!service
            .delete_transaction(&Actor::admin(), &txn_id)
            .await
            .expect("delete"));
    }
}
