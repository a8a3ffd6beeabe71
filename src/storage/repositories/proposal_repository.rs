use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::{ChoreFrequency, ChoreProposal, ProposalStatus};
use crate::storage::db::DbConnection;

/// Repository for chore proposals.
///
/// Every transition names its exact source status in the WHERE clause, the
/// same guard discipline as the ledger. Acceptance (from either `pending` or
/// `countered`) is compound: the status flip, the new one-off chore, and the
/// pending assignment land together or not at all, so a double-acceptance
/// race creates exactly one chore.
#[derive(Clone)]
pub struct ProposalRepository {
    db: DbConnection,
}

fn proposal_from_row(row: &SqliteRow) -> Result<ChoreProposal> {
    Ok(ChoreProposal {
        id: row.get("id"),
        child_id: row.get("child_id"),
        title: row.get("title"),
        description: row.get("description"),
        requested_value: row.get("requested_value"),
        admin_value: row.get("admin_value"),
        status: row.get::<String, _>("status").parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl ProposalRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn insert_proposal(
        &self,
        child_id: &str,
        title: &str,
        description: &str,
        requested_value: f64,
    ) -> Result<ChoreProposal> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO chore_proposals (id, child_id, title, description, requested_value)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(child_id)
        .bind(title)
        .bind(description)
        .bind(requested_value)
        .execute(self.db.pool())
        .await?;

        self.get_proposal(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("proposal vanished after insert: {}", id))
    }

    pub async fn get_proposal(&self, proposal_id: &str) -> Result<Option<ChoreProposal>> {
        let row = sqlx::query("SELECT * FROM chore_proposals WHERE id = ?1")
            .bind(proposal_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(proposal_from_row).transpose()
    }

    pub async fn proposals_for_child(&self, child_id: &str) -> Result<Vec<ChoreProposal>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chore_proposals
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(proposal_from_row).collect()
    }

    pub async fn list_pending(&self) -> Result<Vec<ChoreProposal>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chore_proposals
            WHERE status = 'pending'
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(proposal_from_row).collect()
    }

    /// `pending -> countered`, recording the admin's value.
    pub async fn counter(&self, proposal_id: &str, admin_value: f64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_proposals
            SET admin_value = ?2, status = 'countered', updated_at = datetime('now')
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(proposal_id)
        .bind(admin_value)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `pending -> rejected`. Terminal, no side effects.
    pub async fn reject(&self, proposal_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_proposals
            SET status = 'rejected', updated_at = datetime('now')
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(proposal_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `countered -> declined`. Terminal, no side effects.
    pub async fn decline(&self, proposal_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_proposals
            SET status = 'declined', updated_at = datetime('now')
            WHERE id = ?1 AND status = 'countered'
            "#,
        )
        .bind(proposal_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Accept the proposal from `from_status`, creating a one-off chore and a
    /// pending assignment at the value that state implies (`requested_value`
    /// for `pending`, `admin_value` for `countered`).
    ///
    /// The assignment is created pending: the child still has to do the chore
    /// and walk it through the normal completion flow; nothing is credited
    /// here.
    ///
    /// The guarded status flip opens the transaction and returns the fields
    /// the chore is built from; a racing acceptor blocks on it and then
    /// matches nothing.
    pub async fn accept(&self, proposal_id: &str, from_status: ProposalStatus) -> Result<bool> {
        if !matches!(
            from_status,
            ProposalStatus::Pending | ProposalStatus::Countered
        ) {
            return Ok(false);
        }

        let mut tx = self.db.pool().begin().await?;

        let accepted = sqlx::query(
            r#"
            UPDATE chore_proposals
            SET status = 'accepted', updated_at = datetime('now')
            WHERE id = ?1 AND status = ?2
            RETURNING child_id, title, description, requested_value, admin_value
            "#,
        )
        .bind(proposal_id)
        .bind(from_status.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(accepted) = accepted else {
            tx.rollback().await?;
            return Ok(false);
        };

        let agreed_value = match from_status {
            ProposalStatus::Pending => accepted.get::<f64, _>("requested_value"),
            _ => match accepted.get::<Option<f64>, _>("admin_value") {
                Some(value) => value,
                None => {
                    tx.rollback().await?;
                    return Ok(false);
                }
            },
        };
        let child_id: String = accepted.get("child_id");
        let title: String = accepted.get("title");
        let description: String = accepted.get("description");

        let chore_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO chores (id, title, description, value, frequency)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&chore_id)
        .bind(&title)
        .bind(&description)
        .bind(agreed_value)
        .bind(ChoreFrequency::OneOff.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO chore_assignments (id, child_id, chore_id)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&child_id)
        .bind(&chore_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn count_for_child(&self, child_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chore_proposals WHERE child_id = ?1")
                .bind(child_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::child_repository::ChildRepository;
    use crate::storage::repositories::chore_repository::ChoreRepository;

    async fn setup_test() -> (ProposalRepository, ChildRepository, ChoreRepository) {
        let db = DbConnection::init_test().await.expect("init test db");
        (
            ProposalRepository::new(db.clone()),
            ChildRepository::new(db.clone()),
            ChoreRepository::new(db),
        )
    }

    async fn proposal_fixture(
        proposals: &ProposalRepository,
        children: &ChildRepository,
    ) -> ChoreProposal {
        children.insert_child("c1", "Emma", "").await.expect("child");
        proposals
            .insert_proposal("c1", "Mow the lawn", "Front garden", 5.0)
            .await
            .expect("proposal")
    }

    #[tokio::test]
    async fn test_accept_from_pending_creates_chore_once() {
        let (proposals, children, chores) = setup_test().await;
        let proposal = proposal_fixture(&proposals, &children).await;

        assert!(proposals
            .accept(&proposal.id, ProposalStatus::Pending)
            .await
            .expect("accept"));
        // Replay: status is no longer pending, exactly one chore exists
        assert!(!proposals
            .accept(&proposal.id, ProposalStatus::Pending)
            .await
            .expect("accept"));

        let all_chores = chores.list_chores().await.expect("chores");
        assert_eq!(all_chores.len(), 1);
        assert_eq!(all_chores[0].value, 5.0);
        assert_eq!(all_chores[0].frequency, ChoreFrequency::OneOff);
        let assignments = chores.assignments_for_child("c1").await.expect("assignments");
        assert_eq!(assignments.len(), 1);

        let accepted = proposals
            .get_proposal(&proposal.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(accepted.status, ProposalStatus::Accepted);
    }

    #[tokio::test]
    async fn test_concurrent_acceptance_creates_one_chore() {
        let (proposals, children, chores) = setup_test().await;
        let proposal = proposal_fixture(&proposals, &children).await;

        let (first, second) = tokio::join!(
            proposals.accept(&proposal.id, ProposalStatus::Pending),
            proposals.accept(&proposal.id, ProposalStatus::Pending)
        );
        // Exactly one acceptor wins; the loser gets a clean no-op
        let outcomes = [first.expect("accept"), second.expect("accept")];
        assert_eq!(outcomes.iter().filter(|&&accepted| accepted).count(), 1);

        assert_eq!(chores.list_chores().await.expect("chores").len(), 1);
        assert_eq!(
            chores
                .assignments_for_child("c1")
                .await
                .expect("assignments")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_counter_then_accept_uses_admin_value() {
        let (proposals, children, chores) = setup_test().await;
        let proposal = proposal_fixture(&proposals, &children).await;

        assert!(proposals.counter(&proposal.id, 3.5).await.expect("counter"));
        // Counter is pending-only
        assert!(!proposals.counter(&proposal.id, 2.0).await.expect("counter"));

        assert!(proposals
            .accept(&proposal.id, ProposalStatus::Countered)
            .await
            .expect("accept"));

        let all_chores = chores.list_chores().await.expect("chores");
        assert_eq!(all_chores.len(), 1);
        assert_eq!(all_chores[0].value, 3.5);
    }

    #[tokio::test]
    async fn test_reject_and_decline_are_status_guarded() {
        let (proposals, children, _) = setup_test().await;
        let proposal = proposal_fixture(&proposals, &children).await;

        // Decline requires countered
        assert!(!proposals.decline(&proposal.id).await.expect("decline"));
        assert!(proposals.reject(&proposal.id).await.expect("reject"));
        // Terminal: nothing else applies
        assert!(!proposals.reject(&proposal.id).await.expect("reject"));
        assert!(!proposals.counter(&proposal.id, 1.0).await.expect("counter"));
        assert!(!proposals
            .accept(&proposal.id, ProposalStatus::Pending)
            .await
            .expect("accept"));
    }

    #[tokio::test]
    async fn test_decline_from_countered() {
        let (proposals, children, chores) = setup_test().await;
        let proposal = proposal_fixture(&proposals, &children).await;

        proposals.counter(&proposal.id, 3.5).await.expect("counter");
        assert!(proposals.decline(&proposal.id).await.expect("decline"));

        let declined = proposals
            .get_proposal(&proposal.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(declined.status, ProposalStatus::Declined);
        assert!(chores.list_chores().await.expect("chores").is_empty());
    }
}
