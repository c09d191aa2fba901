//! Deadline arithmetic and the overdue sweep.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use tracing::debug;

use super::model::{SlaPolicy, SlaStatus};
use crate::Result;
use crate::classify::Priority;
use crate::queue::{FollowUpItem, QueueRepository};

/// Computes response deadlines and live SLA status from the configured
/// policy. Stateless apart from the policy itself.
#[derive(Debug, Clone, Default)]
pub struct SlaTracker {
    policy: SlaPolicy,
}

impl SlaTracker {
    /// Creates a tracker with the given policy.
    #[must_use]
    pub const fn new(policy: SlaPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    /// Compute the response deadline for a message received at `received`.
    ///
    /// A VIP `sla_hours` override replaces the priority-based allowance
    /// entirely. With working hours or weekend skipping configured, the
    /// allowance accrues only inside working windows: a critical item
    /// received Monday 23:00 with a 4-hour allowance and hours 9-17
    /// resolves to Tuesday 13:00.
    #[must_use]
    pub fn calculate_deadline(
        &self,
        received: DateTime<Utc>,
        priority: Priority,
        vip_hours: Option<f32>,
    ) -> DateTime<Utc> {
        let hours = vip_hours.unwrap_or_else(|| self.policy.allowance_hours(priority));
        #[allow(clippy::cast_possible_truncation)]
        let mut remaining = Duration::seconds((f64::from(hours) * 3600.0) as i64);

        if self.policy.working_hours.is_none() && !self.policy.skip_weekends {
            return received + remaining;
        }

        let (_, end_hour) = self.policy.window();
        let mut cursor = received;
        loop {
            cursor = self.align_to_window(cursor);
            let close = day_at(cursor.date_naive(), end_hour);
            let available = close - cursor;
            if remaining <= available {
                return cursor + remaining;
            }
            remaining -= available;
            cursor = close;
        }
    }

    /// Move an instant forward to the nearest point where deadline time
    /// accrues: into the daily window, past non-working days.
    fn align_to_window(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let (start_hour, end_hour) = self.policy.window();
        let mut cursor = t;
        loop {
            let date = cursor.date_naive();
            if !self.policy.is_working_day(date) {
                cursor = day_at(next_day(date), start_hour);
                continue;
            }
            let open = day_at(date, start_hour);
            let close = day_at(date, end_hour);
            if cursor < open {
                return open;
            }
            if cursor >= close {
                cursor = day_at(next_day(date), start_hour);
                continue;
            }
            return cursor;
        }
    }

    /// Live status of a deadline at `now`.
    ///
    /// Overdue once `now` passes the deadline; at risk when less than
    /// the configured fraction of the total allowance remains.
    #[must_use]
    pub fn status_at(
        &self,
        deadline: DateTime<Utc>,
        priority: Priority,
        vip_hours: Option<f32>,
        now: DateTime<Utc>,
    ) -> SlaStatus {
        if now > deadline {
            return SlaStatus::Overdue;
        }
        let hours = vip_hours.unwrap_or_else(|| self.policy.allowance_hours(priority));
        let total_secs = f64::from(hours) * 3600.0;
        #[allow(clippy::cast_precision_loss)]
        let remaining_secs = (deadline - now).num_seconds() as f64;
        if remaining_secs < total_secs * f64::from(self.policy.at_risk_fraction) {
            SlaStatus::AtRisk
        } else {
            SlaStatus::OnTime
        }
    }

    /// Sweep active items and return those newly crossed into overdue.
    ///
    /// An item is "newly" overdue when its computed status is overdue
    /// but its stored status is not; the stored status is updated in
    /// the same pass, so re-running without time passing returns
    /// nothing. Safe under at-least-once scheduling.
    ///
    /// The at-risk boundary is computed from the base priority
    /// allowance; items admitted under a VIP `sla_hours` override keep
    /// their shortened deadline but cross into at-risk on the base
    /// scale. Overdue detection is exact either way.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails. Items already
    /// processed stay processed; the sweep is per-item independent.
    pub async fn check_overdue(
        &self,
        repo: &QueueRepository,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpItem>> {
        let mut newly_overdue = Vec::new();

        for mut item in repo.list_active_with_deadline().await? {
            let Some(deadline) = item.sla_deadline else {
                continue;
            };
            let Some(id) = item.id else {
                continue;
            };
            let computed = self.status_at(deadline, item.priority, None, now);
            if item.sla_status == Some(computed) {
                continue;
            }
            repo.set_sla_status(id, computed).await?;
            if computed == SlaStatus::Overdue {
                debug!(item_id = id, "item crossed into overdue");
                item.sla_status = Some(computed);
                newly_overdue.push(item);
            }
        }

        Ok(newly_overdue)
    }
}

/// Midnight-safe "this date at this hour" in UTC wall-clock terms.
/// Hour 24 means midnight of the following day.
#[allow(clippy::expect_used)] // whole hours are always valid times
fn day_at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    if hour >= 24 {
        next_day(date)
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
    } else {
        date.and_hms_opt(hour, 0, 0)
            .expect("whole hour is a valid time")
            .and_utc()
    }
}

/// The calendar day after `date`.
fn next_day(date: NaiveDate) -> NaiveDate {
    date + Days::new(1)
}
