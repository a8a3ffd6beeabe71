use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::models::{AllowanceFrequency, Child};
use crate::storage::db::DbConnection;
use crate::storage::repositories::AllowanceRepository;

/// What one scheduler pass did, for the caller that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSummary {
    pub checked_children: usize,
    pub deposited_children: usize,
    pub total_deposited: f64,
    pub baseline_seeded: usize,
    pub transactions_created: usize,
}

/// Whole periods elapsed between `last` and `today`.
///
/// Weekly counts whole seven-day spans. Monthly counts calendar months,
/// backing off one when today's day-of-month has not yet reached the
/// reference day (the 15th to the 14th of the next month is zero months).
/// A reference in the future yields zero.
pub fn elapsed_periods(frequency: AllowanceFrequency, last: NaiveDate, today: NaiveDate) -> u32 {
    match frequency {
        AllowanceFrequency::None => 0,
        AllowanceFrequency::Weekly => {
            let days = (today - last).num_days();
            if days < 0 {
                0
            } else {
                (days / 7) as u32
            }
        }
        AllowanceFrequency::Monthly => {
            let mut months = (today.year() - last.year()) * 12 + today.month() as i32
                - last.month() as i32;
            if today.day() < last.day() {
                months -= 1;
            }
            months.max(0) as u32
        }
    }
}

fn deposit_description(frequency: AllowanceFrequency, periods: u32) -> String {
    if periods == 1 {
        format!("Allowance ({})", frequency)
    } else {
        format!("Allowance: {} {}s", periods, frequency.period_label())
    }
}

/// The allowance scheduler. Idempotent by construction: each deposit is
/// guarded by the exact configuration and reference date it was computed
/// from, so overlapping runs cannot double-pay (see
/// [`AllowanceRepository::apply_deposit`]).
#[derive(Clone)]
pub struct AllowanceService {
    allowances: AllowanceRepository,
}

impl AllowanceService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            allowances: AllowanceRepository::new(db),
        }
    }

    /// Run one scheduler pass against the local calendar date. Safe to call
    /// from any periodic trigger, as often as it likes.
    pub async fn run_scheduler(&self) -> Result<SchedulerSummary> {
        self.process_for_date(Local::now().date_naive()).await
    }

    /// Date-injected core of [`AllowanceService::run_scheduler`].
    ///
    /// Per child with an active allowance: skip while the start date is still
    /// in the future; otherwise count whole periods since the reference date
    /// (`last_allowance_date`, falling back to the start date, falling back to
    /// today). One catch-up deposit of `amount * periods` covers everything
    /// owed. A child seen for the first time with nothing owed gets a baseline
    /// date recorded so the next pass has a reference.
    pub async fn process_for_date(&self, today: NaiveDate) -> Result<SchedulerSummary> {
        let children = self.allowances.children_with_active_allowance().await?;
        let mut summary = SchedulerSummary {
            checked_children: children.len(),
            ..SchedulerSummary::default()
        };

        for child in &children {
            if let Err(error) = self.process_child(child, today, &mut summary).await {
                // One broken child must not starve the others
                warn!(child_id = %child.id, %error, "scheduler pass failed for child");
            }
        }

        info!(
            checked = summary.checked_children,
            deposited = summary.deposited_children,
            total = summary.total_deposited,
            seeded = summary.baseline_seeded,
            "scheduler pass complete"
        );
        Ok(summary)
    }

    async fn process_child(
        &self,
        child: &Child,
        today: NaiveDate,
        summary: &mut SchedulerSummary,
    ) -> Result<()> {
        if let Some(start) = child.allowance_start_date {
            if start > today {
                return Ok(());
            }
        }

        let reference = child
            .last_allowance_date
            .or(child.allowance_start_date)
            .unwrap_or(today);
        let periods = elapsed_periods(child.allowance_frequency, reference, today);

        if periods == 0 {
            if child.last_allowance_date.is_none()
                && self.allowances.seed_baseline(&child.id, reference).await?
            {
                summary.baseline_seeded += 1;
                info!(child_id = %child.id, %reference, "seeded allowance baseline");
            }
            return Ok(());
        }

        let total = child.allowance_amount * periods as f64;
        let description = deposit_description(child.allowance_frequency, periods);
        if self
            .allowances
            .apply_deposit(child, total, today, &description)
            .await?
        {
            summary.deposited_children += 1;
            summary.total_deposited += total;
            summary.transactions_created += 1;
            info!(child_id = %child.id, periods, total, "allowance deposited");
        }
        Ok(())
    }
}
