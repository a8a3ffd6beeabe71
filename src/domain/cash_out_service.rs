use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::domain::models::CashOutRequest;
use crate::storage::db::DbConnection;
use crate::storage::repositories::CashOutRepository;

/// Cash-out requests: a child asks to convert tracked balance into real money.
///
/// The amount is held in escrow from the moment of the request. Approval only
/// confirms the handover happened; rejection puts the money back.
#[derive(Clone)]
pub struct CashOutService {
    cash_outs: CashOutRepository,
}

impl CashOutService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            cash_outs: CashOutRepository::new(db),
        }
    }

    /// Request a cash-out. Child only, for their own account; admins hand out
    /// money through the ledger instead. A non-positive amount or insufficient
    /// balance is a silent no-op.
    pub async fn request_cash_out(
        &self,
        actor: &Actor,
        child_id: &str,
        amount: f64,
    ) -> Result<bool> {
        if !actor.is_child_owner(child_id) {
            warn!(child_id, "request_cash_out refused: actor is not the owning child");
            return Ok(false);
        }
        if amount <= 0.0 {
            warn!(child_id, amount, "request_cash_out refused: non-positive amount");
            return Ok(false);
        }
        let requested = self.cash_outs.request(child_id, amount).await?;
        if requested {
            info!(child_id, amount, "cash-out requested, amount held");
        } else {
            info!(child_id, amount, "cash-out rejected by balance guard");
        }
        Ok(requested)
    }

    /// Approve a pending request. Admin only; the balance already moved at
    /// request time.
    pub async fn approve_cash_out(&self, actor: &Actor, request_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(request_id, "approve_cash_out refused: actor is not an admin");
            return Ok(false);
        }
        let approved = self.cash_outs.approve(request_id).await?;
        if approved {
            info!(request_id, "cash-out approved");
        }
        Ok(approved)
    }

    /// Reject a pending request, refunding the held amount. Admin only.
    pub async fn reject_cash_out(&self, actor: &Actor, request_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(request_id, "reject_cash_out refused: actor is not an admin");
            return Ok(false);
        }
        match self.cash_outs.reject(request_id).await? {
            Some(child_id) => {
                info!(request_id, child_id = %child_id, "cash-out rejected and refunded");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// A child's cash-out history. The actor must cover the child.
    pub async fn requests_for_child(
        &self,
        actor: &Actor,
        child_id: &str,
    ) -> Result<Vec<CashOutRequest>> {
        if !actor.can_act_on(child_id) {
            return Ok(Vec::new());
        }
        self.cash_outs.requests_for_child(child_id).await
    }

    /// All pending requests, for the admin approval queue.
    pub async fn pending_requests(&self, actor: &Actor) -> Result<Vec<CashOutRequest>> {
        if !actor.is_admin() {
            return Ok(Vec::new());
        }
        self.cash_outs.list_pending().await
    }
}
