//! Achievement definitions.
//!
//! Achievements are threshold checks over aggregate history, recomputed on
//! every read. Nothing is persisted when one unlocks, so the set is always
//! consistent with the underlying assignment and transaction logs.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_chore",
        title: "First Steps",
        description: "Completed your first chore",
        icon: "🌟",
    },
    Achievement {
        id: "chores_10",
        title: "Getting Going",
        description: "Completed 10 chores",
        icon: "💪",
    },
    Achievement {
        id: "chores_25",
        title: "Chore Champion",
        description: "Completed 25 chores",
        icon: "🏅",
    },
    Achievement {
        id: "chores_50",
        title: "Unstoppable",
        description: "Completed 50 chores",
        icon: "🔥",
    },
    Achievement {
        id: "chores_100",
        title: "Chore Legend",
        description: "Completed 100 chores",
        icon: "👑",
    },
    Achievement {
        id: "first_reward",
        title: "Treat Yourself",
        description: "Claimed your first reward",
        icon: "🎁",
    },
    Achievement {
        id: "first_proposal",
        title: "Entrepreneur",
        description: "Proposed a chore",
        icon: "💡",
    },
    Achievement {
        id: "earnings_10",
        title: "Tenner",
        description: "Earned £10 lifetime",
        icon: "💰",
    },
    Achievement {
        id: "earnings_50",
        title: "Fifty Quid",
        description: "Earned £50 lifetime",
        icon: "💎",
    },
    Achievement {
        id: "earnings_100",
        title: "Century Club",
        description: "Earned £100 lifetime",
        icon: "🏆",
    },
    Achievement {
        id: "streak_7",
        title: "Week Warrior",
        description: "Achieved a 7-day streak",
        icon: "⚡",
    },
];
