use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::domain::models::{AllowanceFrequency, Child};
use crate::storage::db::DbConnection;
use crate::storage::repositories::ChildRepository;

/// Operations on child accounts and their allowance configuration.
#[derive(Clone)]
pub struct ChildService {
    children: ChildRepository,
}

impl ChildService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            children: ChildRepository::new(db),
        }
    }

    /// Create a child with a zero balance and no allowance. Admin only.
    pub async fn create_child(
        &self,
        actor: &Actor,
        name: &str,
        avatar: &str,
    ) -> Result<Option<Child>> {
        if !actor.is_admin() {
            warn!(name, "create_child refused: actor is not an admin");
            return Ok(None);
        }
        let id = Uuid::new_v4().to_string();
        self.children.insert_child(&id, name, avatar).await?;
        info!(child_id = %id, name, "created child");
        self.children.get_child(&id).await
    }

    pub async fn get_child(&self, child_id: &str) -> Result<Option<Child>> {
        self.children.get_child(child_id).await
    }

    pub async fn list_children(&self) -> Result<Vec<Child>> {
        self.children.list_children().await
    }

    /// Delete a child and everything hanging off them. Admin only.
    pub async fn delete_child(&self, actor: &Actor, child_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(child_id, "delete_child refused: actor is not an admin");
            return Ok(false);
        }
        let deleted = self.children.delete_child(child_id).await?;
        if deleted {
            info!(child_id, "deleted child and all dependent rows");
        }
        Ok(deleted)
    }

    /// Configure or clear a child's recurring allowance. Admin only.
    ///
    /// `AllowanceFrequency::None` disables the allowance entirely; the amount
    /// and dates passed alongside are ignored and cleared.
    pub async fn update_allowance(
        &self,
        actor: &Actor,
        child_id: &str,
        amount: f64,
        frequency: AllowanceFrequency,
        start_date: Option<NaiveDate>,
    ) -> Result<bool> {
        if !actor.is_admin() {
            warn!(child_id, "update_allowance refused: actor is not an admin");
            return Ok(false);
        }
        if frequency != AllowanceFrequency::None && amount < 0.0 {
            warn!(child_id, amount, "update_allowance refused: negative amount");
            return Ok(false);
        }
        let updated = self
            .children
            .set_allowance_config(child_id, amount, frequency, start_date)
            .await?;
        if updated {
            info!(child_id, %frequency, amount, "updated allowance configuration");
        }
        Ok(updated)
    }
}
