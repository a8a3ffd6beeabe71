//! Actor capabilities for core operations.
//!
//! Authentication and session handling live outside this crate; by the time an
//! operation is invoked the caller has already resolved *who* is acting. The
//! [`Actor`] value is that resolved identity, and every mutating operation
//! checks the relevant predicate up front, no-opping when it fails.

use serde::{Deserialize, Serialize};

/// The acting identity behind an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Actor {
    /// A parent/administrator. May act on any child.
    Admin,
    /// A signed-in child. May only act on itself.
    Child { child_id: String },
}

impl Actor {
    pub fn admin() -> Self {
        Actor::Admin
    }

    pub fn child(child_id: impl Into<String>) -> Self {
        Actor::Child {
            child_id: child_id.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }

    /// Whether this actor may mutate state owned by `child_id`.
    pub fn can_act_on(&self, child_id: &str) -> bool {
        match self {
            Actor::Admin => true,
            Actor::Child { child_id: own } => own == child_id,
        }
    }

    /// Whether this actor *is* the child that owns `child_id`.
    ///
    /// Stricter than [`Actor::can_act_on`]: admins do not qualify. Used for
    /// operations the design reserves to the child itself (creating proposals,
    /// requesting cash-outs, accepting or declining counters).
    pub fn is_child_owner(&self, child_id: &str) -> bool {
        matches!(self, Actor::Child { child_id: own } if own == child_id)
    }

    /// The child id this actor is signed in as, if any.
    pub fn signed_in_child_id(&self) -> Option<&str> {
        match self {
            Actor::Admin => None,
            Actor::Child { child_id } => Some(child_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_act_on_any_child() {
        let actor = Actor::admin();
        assert!(actor.is_admin());
        assert!(actor.can_act_on("child-1"));
        assert!(actor.can_act_on("child-2"));
        assert!(actor.signed_in_child_id().is_none());
    }

    #[test]
    fn child_can_only_act_on_itself() {
        let actor = Actor::child("child-1");
        assert!(!actor.is_admin());
        assert!(actor.can_act_on("child-1"));
        assert!(!actor.can_act_on("child-2"));
        assert_eq!(actor.signed_in_child_id(), Some("child-1"));
    }

    #[test]
    fn admin_is_not_a_child_owner() {
        assert!(!Actor::admin().is_child_owner("child-1"));
        assert!(Actor::child("child-1").is_child_owner("child-1"));
        assert!(!Actor::child("child-2").is_child_owner("child-1"));
    }
}
