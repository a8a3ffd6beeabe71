use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::domain::models::{
    AssignmentStatus, Chore, ChoreAssignment, ChoreFrequency, NewChore,
};
use crate::storage::db::DbConnection;
use crate::storage::repositories::ChoreRepository;

/// Expand a recurring assignment over an inclusive date range.
///
/// Daily yields every date in `start..=end`; weekly yields the dates whose
/// weekday matches `day_of_week` (0 = Sunday .. 6 = Saturday). A range where
/// `end < start` yields nothing, as does a one-off.
pub fn recurrence_dates(
    frequency: ChoreFrequency,
    day_of_week: Option<u8>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let matches = match frequency {
            ChoreFrequency::Daily => true,
            ChoreFrequency::Weekly => {
                day_of_week == Some(cursor.weekday().num_days_from_sunday() as u8)
            }
            ChoreFrequency::OneOff => false,
        };
        if matches {
            dates.push(cursor);
        }
        cursor = match cursor.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// Chore templates, assignment (including recurrence expansion) and the
/// pending → completed → approved lifecycle.
#[derive(Clone)]
pub struct ChoreService {
    chores: ChoreRepository,
}

impl ChoreService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            chores: ChoreRepository::new(db),
        }
    }

    // ── Templates ────────────────────────────────────────────────────

    /// Create a chore template. Admin only; the shape is validated before
    /// anything is written.
    pub async fn create_chore(&self, actor: &Actor, new_chore: NewChore) -> Result<Option<Chore>> {
        if !actor.is_admin() {
            warn!(title = %new_chore.title, "create_chore refused: actor is not an admin");
            return Ok(None);
        }
        new_chore.validate()?;
        let chore = self.chores.insert_chore(&new_chore).await?;
        info!(chore_id = %chore.id, title = %chore.title, "created chore");
        Ok(Some(chore))
    }

    pub async fn get_chore(&self, chore_id: &str) -> Result<Option<Chore>> {
        self.chores.get_chore(chore_id).await
    }

    pub async fn list_chores(&self) -> Result<Vec<Chore>> {
        self.chores.list_chores().await
    }

    pub async fn update_chore(&self, actor: &Actor, chore: &Chore) -> Result<bool> {
        if !actor.is_admin() {
            warn!(chore_id = %chore.id, "update_chore refused: actor is not an admin");
            return Ok(false);
        }
        self.chores.update_chore(chore).await
    }

    pub async fn delete_chore(&self, actor: &Actor, chore_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(chore_id, "delete_chore refused: actor is not an admin");
            return Ok(false);
        }
        self.chores.delete_chore(chore_id).await
    }

    // ── Assignment ───────────────────────────────────────────────────

    /// Assign a chore to a child. Admin only.
    ///
    /// One-off chores produce a single assignment at `due_date`. Recurring
    /// chores expand from today through `end_date` (inclusive), every row
    /// sharing one recurrence source id; an end date already in the past
    /// expands to nothing, which is not an error.
    pub async fn assign_chore(
        &self,
        actor: &Actor,
        child_id: &str,
        chore_id: &str,
        due_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<ChoreAssignment>> {
        self.assign_chore_from(
            actor,
            child_id,
            chore_id,
            due_date,
            end_date,
            Local::now().date_naive(),
        )
        .await
    }

    /// Date-injected core of [`ChoreService::assign_chore`].
    pub async fn assign_chore_from(
        &self,
        actor: &Actor,
        child_id: &str,
        chore_id: &str,
        due_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Vec<ChoreAssignment>> {
        if !actor.is_admin() {
            warn!(child_id, chore_id, "assign_chore refused: actor is not an admin");
            return Ok(Vec::new());
        }
        let Some(chore) = self.chores.get_chore(chore_id).await? else {
            warn!(chore_id, "assign_chore refused: unknown chore");
            return Ok(Vec::new());
        };

        if chore.frequency == ChoreFrequency::OneOff {
            let assignment = self
                .chores
                .insert_assignment(child_id, chore_id, due_date, None, None)
                .await?;
            info!(child_id, chore_id, "assigned one-off chore");
            return Ok(vec![assignment]);
        }

        let Some(end) = end_date else {
            warn!(chore_id, "assign_chore refused: recurring chore needs an end date");
            return Ok(Vec::new());
        };
        let source_id = Uuid::new_v4().to_string();
        let mut assignments = Vec::new();
        for date in recurrence_dates(chore.frequency, chore.day_of_week, today, end) {
            let assignment = self
                .chores
                .insert_assignment(child_id, chore_id, Some(date), Some(end), Some(&source_id))
                .await?;
            assignments.push(assignment);
        }
        info!(
            child_id,
            chore_id,
            count = assignments.len(),
            "assigned recurring chore"
        );
        Ok(assignments)
    }

    pub async fn assignments_for_child(&self, child_id: &str) -> Result<Vec<ChoreAssignment>> {
        self.chores.assignments_for_child(child_id).await
    }

    /// Completed assignments waiting for an admin decision. Admin only.
    pub async fn awaiting_approval(&self, actor: &Actor) -> Result<Vec<ChoreAssignment>> {
        if !actor.is_admin() {
            return Ok(Vec::new());
        }
        self.chores.list_awaiting_approval().await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Mark an assignment done. The owning child or an admin; guarded so only
    /// a pending assignment transitions.
    pub async fn mark_done(&self, actor: &Actor, assignment_id: &str) -> Result<bool> {
        let Some(assignment) = self.chores.get_assignment(assignment_id).await? else {
            return Ok(false);
        };
        if !actor.can_act_on(&assignment.child_id) {
            warn!(assignment_id, "mark_done refused: actor cannot act on this child");
            return Ok(false);
        }
        let marked = self.chores.mark_done(assignment_id).await?;
        if marked {
            info!(assignment_id, child_id = %assignment.child_id, "assignment marked done");
        }
        Ok(marked)
    }

    /// Approve a completed assignment, crediting its value. Admin only.
    pub async fn approve(&self, actor: &Actor, assignment_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(assignment_id, "approve refused: actor is not an admin");
            return Ok(false);
        }
        match self.chores.approve(assignment_id).await? {
            Some(child_id) => {
                info!(assignment_id, child_id = %child_id, "assignment approved and credited");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Force an assignment into `status`, bypassing the normal lifecycle.
    /// Admin only.
    ///
    /// Overriding to `approved` goes through the normal approval (so it still
    /// requires a completed assignment and credits exactly once). Overriding
    /// to `completed` stamps the completion time without credit. Overriding to
    /// `pending` clears both timestamps; any credit from an earlier approval
    /// stays on the books.
    pub async fn override_status(
        &self,
        actor: &Actor,
        assignment_id: &str,
        status: AssignmentStatus,
    ) -> Result<bool> {
        if !actor.is_admin() {
            warn!(assignment_id, "override_status refused: actor is not an admin");
            return Ok(false);
        }
        let applied = match status {
            AssignmentStatus::Approved => self.chores.approve(assignment_id).await?.is_some(),
            AssignmentStatus::Completed => self.chores.force_completed(assignment_id).await?,
            AssignmentStatus::Pending => self.chores.force_pending(assignment_id).await?,
        };
        if applied {
            info!(assignment_id, status = status.as_str(), "assignment status overridden");
        }
        Ok(applied)
    }

    pub async fn delete_assignment(&self, actor: &Actor, assignment_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(assignment_id, "delete_assignment refused: actor is not an admin");
            return Ok(false);
        }
        self.chores.delete_assignment(assignment_id).await
    }
}
