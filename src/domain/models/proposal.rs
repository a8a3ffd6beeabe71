//! Domain model for chore proposals (the barter system).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A child-initiated offer: "I'll do X for this much".
///
/// State machine: `pending -> {accepted, countered, rejected}` and
/// `countered -> {accepted, declined}`. `accepted`, `rejected` and `declined`
/// are terminal. Acceptance (either route) creates a one-off chore plus a
/// pending assignment at the agreed value; the child still completes it
/// through the normal lifecycle, so no credit happens at acceptance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreProposal {
    pub id: String,
    pub child_id: String,
    pub title: String,
    pub description: String,
    pub requested_value: f64,
    /// Set when an admin counters; the value a counter-acceptance pays out at.
    pub admin_value: Option<f64>,
    pub status: ProposalStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl ChoreProposal {
    /// The value the chore will carry if the proposal is accepted in its
    /// current state: the admin's counter once one exists, otherwise the
    /// child's asking price.
    pub fn agreed_value(&self) -> f64 {
        self.admin_value.unwrap_or(self.requested_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Countered,
    Accepted,
    Rejected,
    Declined,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Countered => "countered",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Accepted | ProposalStatus::Rejected | ProposalStatus::Declined
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "countered" => Ok(ProposalStatus::Countered),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            "declined" => Ok(ProposalStatus::Declined),
            other => Err(anyhow::anyhow!("unknown proposal status: {}", other)),
        }
    }
}
