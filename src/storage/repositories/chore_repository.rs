use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::models::{Chore, ChoreAssignment, NewChore, TransactionType};
use crate::storage::db::DbConnection;

/// Repository for chore templates and their assignments.
///
/// Lifecycle transitions are guarded updates: the WHERE clause names the exact
/// source status, so a transition that lost a race affects zero rows and the
/// caller sees a clean no-op. Approval is the one compound writer here: it
/// crosses into the ledger and must credit exactly once.
#[derive(Clone)]
pub struct ChoreRepository {
    db: DbConnection,
}

fn chore_from_row(row: &SqliteRow) -> Result<Chore> {
    Ok(Chore {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        value: row.get("value"),
        frequency: row.get::<String, _>("frequency").parse()?,
        day_of_week: row.get::<Option<i64>, _>("day_of_week").map(|d| d as u8),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn assignment_from_row(row: &SqliteRow) -> Result<ChoreAssignment> {
    Ok(ChoreAssignment {
        id: row.get("id"),
        child_id: row.get("child_id"),
        chore_id: row.get("chore_id"),
        status: row.get::<String, _>("status").parse()?,
        due_date: row.get("due_date"),
        end_date: row.get("end_date"),
        recurrence_source_id: row.get("recurrence_source_id"),
        completed_at: row.get("completed_at"),
        approved_at: row.get("approved_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Per-day completion tallies for one child, used by the streak calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCompletion {
    pub due_date: NaiveDate,
    pub total: i64,
    pub approved: i64,
}

impl DayCompletion {
    /// A date counts towards a streak only when it has work and all of it was
    /// approved.
    pub fn fully_done(&self) -> bool {
        self.total > 0 && self.total == self.approved
    }
}

impl ChoreRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    // ── Chore templates ──────────────────────────────────────────────

    pub async fn insert_chore(&self, new_chore: &NewChore) -> Result<Chore> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO chores (id, title, description, value, frequency, day_of_week)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(&new_chore.title)
        .bind(&new_chore.description)
        .bind(new_chore.value)
        .bind(new_chore.frequency.as_str())
        .bind(new_chore.day_of_week.map(|d| d as i64))
        .execute(self.db.pool())
        .await?;

        self.get_chore(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("chore vanished after insert: {}", id))
    }

    pub async fn get_chore(&self, chore_id: &str) -> Result<Option<Chore>> {
        let row = sqlx::query("SELECT * FROM chores WHERE id = ?1")
            .bind(chore_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(chore_from_row).transpose()
    }

    pub async fn list_chores(&self) -> Result<Vec<Chore>> {
        let rows = sqlx::query("SELECT * FROM chores ORDER BY title ASC")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(chore_from_row).collect()
    }

    pub async fn update_chore(&self, chore: &Chore) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chores
            SET title = ?2, description = ?3, value = ?4, frequency = ?5,
                day_of_week = ?6, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(&chore.id)
        .bind(&chore.title)
        .bind(&chore.description)
        .bind(chore.value)
        .bind(chore.frequency.as_str())
        .bind(chore.day_of_week.map(|d| d as i64))
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_chore(&self, chore_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chores WHERE id = ?1")
            .bind(chore_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Assignments ──────────────────────────────────────────────────

    pub async fn insert_assignment(
        &self,
        child_id: &str,
        chore_id: &str,
        due_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        recurrence_source_id: Option<&str>,
    ) -> Result<ChoreAssignment> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO chore_assignments
                (id, child_id, chore_id, due_date, end_date, recurrence_source_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(child_id)
        .bind(chore_id)
        .bind(due_date)
        .bind(end_date)
        .bind(recurrence_source_id)
        .execute(self.db.pool())
        .await?;

        self.get_assignment(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("assignment vanished after insert: {}", id))
    }

    pub async fn get_assignment(&self, assignment_id: &str) -> Result<Option<ChoreAssignment>> {
        let row = sqlx::query("SELECT * FROM chore_assignments WHERE id = ?1")
            .bind(assignment_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(assignment_from_row).transpose()
    }

    pub async fn assignments_for_child(&self, child_id: &str) -> Result<Vec<ChoreAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chore_assignments
            WHERE child_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(assignment_from_row).collect()
    }

    /// Assignments waiting for an admin decision, oldest completion first.
    pub async fn list_awaiting_approval(&self) -> Result<Vec<ChoreAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chore_assignments
            WHERE status = 'completed'
            ORDER BY completed_at ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(assignment_from_row).collect()
    }

    /// Child-side transition `pending -> completed`. The status guard makes a
    /// double-completion race a no-op for the loser.
    pub async fn mark_done(&self, assignment_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_assignments
            SET status = 'completed', completed_at = datetime('now'), updated_at = datetime('now')
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(assignment_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Admin-side transition `completed -> approved`, crediting the chore's
    /// value and logging the `earn` entry, all-or-nothing.
    ///
    /// The status guard on the UPDATE is what makes concurrent approval safe:
    /// whichever caller commits first flips the row, the other matches
    /// nothing and rolls back. The guarded flip must be the transaction's
    /// first statement; starting with a read would leave two racing callers
    /// each holding a read lock that neither can upgrade. Returns the child
    /// id when the approval applied.
    pub async fn approve(&self, assignment_id: &str) -> Result<Option<String>> {
        let mut tx = self.db.pool().begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE chore_assignments
            SET status = 'approved', approved_at = datetime('now'), updated_at = datetime('now')
            WHERE id = ?1 AND status = 'completed'
            RETURNING child_id, chore_id
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(flipped) = flipped else {
            tx.rollback().await?;
            return Ok(None);
        };
        let child_id: String = flipped.get("child_id");
        let chore_id: String = flipped.get("chore_id");

        let chore = sqlx::query("SELECT value, title FROM chores WHERE id = ?1")
            .bind(&chore_id)
            .fetch_one(&mut *tx)
            .await?;
        let chore_value: f64 = chore.get("value");
        let chore_title: String = chore.get("title");

        sqlx::query(
            r#"
            UPDATE children
            SET balance = balance + ?2, updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(&child_id)
        .bind(chore_value)
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
        .bind(chore_value)
        .bind(TransactionType::Earn.as_str())
        .bind(format!("Completed: {}", chore_title))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(child_id))
    }

    /// Admin override to `completed`: stamps the completion time without any
    /// credit, regardless of current status.
    pub async fn force_completed(&self, assignment_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_assignments
            SET status = 'completed', completed_at = datetime('now'), updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(assignment_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Admin override back to `pending`: clears both timestamps. Any credit
    /// from an earlier approval is left in place; the operator corrects the
    /// balance separately if that was not intended.
    pub async fn force_pending(&self, assignment_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chore_assignments
            SET status = 'pending', completed_at = NULL, approved_at = NULL,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(assignment_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_assignment(&self, assignment_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chore_assignments WHERE id = ?1")
            .bind(assignment_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Derived-state queries ────────────────────────────────────────

    /// Group a child's dated assignments by due date with total and approved
    /// counts, newest first. Input to the streak walk.
    pub async fn daily_completion(&self, child_id: &str) -> Result<Vec<DayCompletion>> {
        let rows = sqlx::query(
            r#"
            SELECT due_date,
                   COUNT(*) AS total,
                   SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END) AS approved
            FROM chore_assignments
            WHERE child_id = ?1 AND due_date IS NOT NULL
            GROUP BY due_date
            ORDER BY due_date DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| DayCompletion {
                due_date: row.get("due_date"),
                total: row.get("total"),
                approved: row.get("approved"),
            })
            .collect())
    }

    /// Chores a child has done (completed or approved), for achievements.
    pub async fn count_done(&self, child_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chore_assignments
            WHERE child_id = ?1 AND status IN ('completed', 'approved')
            "#,
        )
        .bind(child_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }
}
