use anyhow::Result;
use tracing::{info, warn};

use crate::auth::Actor;
use crate::domain::models::{ChoreProposal, ProposalStatus};
use crate::storage::db::DbConnection;
use crate::storage::repositories::ProposalRepository;

/// The chore-proposal negotiation: a child pitches a chore at a price, the
/// admin approves, rejects or counters, and a countered proposal comes back to
/// the child to accept or decline.
///
/// Acceptance from either side materialises the chore and a pending
/// assignment; the child still earns the money through the normal completion
/// flow.
#[derive(Clone)]
pub struct ProposalService {
    proposals: ProposalRepository,
}

impl ProposalService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            proposals: ProposalRepository::new(db),
        }
    }

    /// Create a proposal. Child only, under their own identity.
    pub async fn create_proposal(
        &self,
        actor: &Actor,
        title: &str,
        description: &str,
        requested_value: f64,
    ) -> Result<Option<ChoreProposal>> {
        let Some(child_id) = actor.signed_in_child_id() else {
            warn!(title, "create_proposal refused: actor is not a child");
            return Ok(None);
        };
        if requested_value < 0.0 {
            warn!(title, requested_value, "create_proposal refused: negative value");
            return Ok(None);
        }
        let proposal = self
            .proposals
            .insert_proposal(child_id, title, description, requested_value)
            .await?;
        info!(proposal_id = %proposal.id, child_id, requested_value, "proposal created");
        Ok(Some(proposal))
    }

    /// Approve a pending proposal at the child's asking price. Admin only.
    pub async fn approve_proposal(&self, actor: &Actor, proposal_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(proposal_id, "approve_proposal refused: actor is not an admin");
            return Ok(false);
        }
        let accepted = self
            .proposals
            .accept(proposal_id, ProposalStatus::Pending)
            .await?;
        if accepted {
            info!(proposal_id, "proposal approved, chore created");
        }
        Ok(accepted)
    }

    /// Counter a pending proposal at a different value. Admin only.
    pub async fn counter_proposal(
        &self,
        actor: &Actor,
        proposal_id: &str,
        admin_value: f64,
    ) -> Result<bool> {
        if !actor.is_admin() {
            warn!(proposal_id, "counter_proposal refused: actor is not an admin");
            return Ok(false);
        }
        if admin_value < 0.0 {
            warn!(proposal_id, admin_value, "counter_proposal refused: negative value");
            return Ok(false);
        }
        let countered = self.proposals.counter(proposal_id, admin_value).await?;
        if countered {
            info!(proposal_id, admin_value, "proposal countered");
        }
        Ok(countered)
    }

    /// Reject a pending proposal outright. Admin only.
    pub async fn reject_proposal(&self, actor: &Actor, proposal_id: &str) -> Result<bool> {
        if !actor.is_admin() {
            warn!(proposal_id, "reject_proposal refused: actor is not an admin");
            return Ok(false);
        }
        let rejected = self.proposals.reject(proposal_id).await?;
        if rejected {
            info!(proposal_id, "proposal rejected");
        }
        Ok(rejected)
    }

    /// Accept the admin's counter-offer. Only the child who made the proposal.
    pub async fn accept_counter(&self, actor: &Actor, proposal_id: &str) -> Result<bool> {
        let Some(proposal) = self.proposals.get_proposal(proposal_id).await? else {
            return Ok(false);
        };
        if !actor.is_child_owner(&proposal.child_id) {
            warn!(proposal_id, "accept_counter refused: actor is not the proposing child");
            return Ok(false);
        }
        let accepted = self
            .proposals
            .accept(proposal_id, ProposalStatus::Countered)
            .await?;
        if accepted {
            info!(proposal_id, "counter accepted, chore created at the countered value");
        }
        Ok(accepted)
    }

    /// Walk away from the admin's counter-offer. Only the proposing child.
    pub async fn decline_counter(&self, actor: &Actor, proposal_id: &str) -> Result<bool> {
        let Some(proposal) = self.proposals.get_proposal(proposal_id).await? else {
            return Ok(false);
        };
        if !actor.is_child_owner(&proposal.child_id) {
            warn!(proposal_id, "decline_counter refused: actor is not the proposing child");
            return Ok(false);
        }
        let declined = self.proposals.decline(proposal_id).await?;
        if declined {
            info!(proposal_id, "counter declined");
        }
        Ok(declined)
    }

    /// A child's proposal history. The actor must cover the child.
    pub async fn proposals_for_child(
        &self,
        actor: &Actor,
        child_id: &str,
    ) -> Result<Vec<ChoreProposal>> {
        if !actor.can_act_on(child_id) {
            return Ok(Vec::new());
        }
        self.proposals.proposals_for_child(child_id).await
    }

    /// Proposals awaiting an admin decision. Admin only.
    pub async fn pending_proposals(&self, actor: &Actor) -> Result<Vec<ChoreProposal>> {
        if !actor.is_admin() {
            return Ok(Vec::new());
        }
        self.proposals.list_pending().await
    }
}
