use std::collections::HashSet;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::db::DbConnection;
use crate::storage::repositories::ChoreRepository;

/// A child's chore streak: the run ending now and the best run ever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub best: u32,
}

/// Compute a streak from the set of dates on which every assignment was
/// approved.
///
/// The current streak is the consecutive run ending today, with one day of
/// grace: a run ending yesterday still counts, because today's chores may
/// simply not be done yet. The best streak is the longest consecutive run
/// anywhere in history, independent of today.
pub fn compute_streak(fully_done: &[NaiveDate], today: NaiveDate) -> Streak {
    let done: HashSet<NaiveDate> = fully_done.iter().copied().collect();

    let mut current = 0u32;
    let anchor = if done.contains(&today) {
        Some(today)
    } else {
        today
            .checked_sub_days(Days::new(1))
            .filter(|yesterday| done.contains(yesterday))
    };
    if let Some(mut cursor) = anchor {
        while done.contains(&cursor) {
            current += 1;
            match cursor.checked_sub_days(Days::new(1)) {
                Some(previous) => cursor = previous,
                None => break,
            }
        }
    }

    let mut sorted: Vec<NaiveDate> = done.into_iter().collect();
    sorted.sort_unstable();
    let mut best = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for date in sorted {
        run = match previous {
            Some(prev) if prev.checked_add_days(Days::new(1)) == Some(date) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(date);
    }

    Streak { current, best }
}

/// Storage-backed streak reads.
#[derive(Clone)]
pub struct StreakService {
    chores: ChoreRepository,
}

impl StreakService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            chores: ChoreRepository::new(db),
        }
    }

    pub async fn streak_for_child(&self, child_id: &str) -> Result<Streak> {
        self.streak_for_child_at(child_id, Local::now().date_naive())
            .await
    }

    /// Date-injected core of [`StreakService::streak_for_child`].
    pub async fn streak_for_child_at(&self, child_id: &str, today: NaiveDate) -> Result<Streak> {
        let completion = self.chores.daily_completion(child_id).await?;
        let fully_done: Vec<NaiveDate> = completion
            .iter()
            .filter(|day| day.fully_done())
            .map(|day| day.due_date)
            .collect();
        Ok(compute_streak(&fully_done, today))
    }
}
