//! Queue state machine and operations.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::model::{
    BulkFailure, BulkResult, FollowUpItem, FollowUpReason, ItemPatch, ItemStatus, QueueFilter,
    QueueStatistics, SnoozeCommand,
};
use super::repository::QueueRepository;
use crate::classify::{ClassificationResult, Priority, SuggestedAction};
use crate::message::EmailContext;
use crate::sla::SlaTracker;
use crate::vip::VipContact;
use crate::{Error, Result};

/// The follow-up queue: the only component that mutates persisted
/// queue state. Constructed once and shared by reference.
pub struct FollowUpQueue {
    repo: QueueRepository,
    tracker: SlaTracker,
}

impl FollowUpQueue {
    /// Creates a queue over the given repository and SLA tracker.
    #[must_use]
    pub const fn new(repo: QueueRepository, tracker: SlaTracker) -> Self {
        Self { repo, tracker }
    }

    /// The SLA tracker in use.
    #[must_use]
    pub const fn tracker(&self) -> &SlaTracker {
        &self.tracker
    }

    /// The underlying repository, for sweeps that scan queue state.
    #[must_use]
    pub const fn repository(&self) -> &QueueRepository {
        &self.repo
    }

    /// Admit an item. Status is forced to pending and counters are
    /// zeroed regardless of what the caller passed.
    ///
    /// Admission is not de-duplicated by message id here; callers that
    /// may classify the same message twice check `find_by_email_id`
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_item(&self, mut item: FollowUpItem) -> Result<i64> {
        item.status = ItemStatus::Pending;
        item.action_count = 0;
        item.snooze_count = 0;
        item.snoozed_until = None;
        let id = self.repo.insert(&item).await?;
        debug!(item_id = id, email_id = %item.email_id, "item admitted to queue");
        Ok(id)
    }

    /// Get an item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_item(&self, id: i64) -> Result<Option<FollowUpItem>> {
        self.repo.get(id).await
    }

    /// List non-terminal items matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn active_items(&self, filter: &QueueFilter) -> Result<Vec<FollowUpItem>> {
        self.repo.list_active(filter).await
    }

    /// Merge a patch into an item, bumping its action counter.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown, or an error if the
    /// database operation fails.
    pub async fn update_item(&self, id: i64, patch: ItemPatch) -> Result<FollowUpItem> {
        let mut item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("item", id))?;

        if let Some(priority) = patch.priority {
            item.priority = priority;
        }
        if let Some(category) = patch.category {
            item.category = category;
        }
        if let Some(labels) = patch.labels {
            item.labels = labels;
        }
        if let Some(status) = patch.status {
            item.status = status;
            if status.is_terminal() {
                item.sla_status = None;
            }
        }
        if let Some(reason) = patch.reason {
            item.reason = reason;
        }
        if let Some(reasoning) = patch.ai_reasoning {
            item.ai_reasoning = Some(reasoning);
        }
        item.action_count += 1;
        item.last_action_date = Some(Utc::now());

        self.repo.update(&item).await?;
        Ok(item)
    }

    /// Snooze an item until a future time.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the time is not in the future or
    /// the item is already terminal, `NotFound` for an unknown id, or
    /// an error if the database operation fails.
    pub async fn snooze_item(&self, id: i64, command: SnoozeCommand) -> Result<FollowUpItem> {
        let now = Utc::now();
        if command.until <= now {
            return Err(Error::Validation(format!(
                "snooze time {} is not in the future",
                command.until.to_rfc3339()
            )));
        }

        let mut item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("item", id))?;
        if item.status.is_terminal() {
            return Err(Error::Validation(format!(
                "cannot snooze {} item {id}",
                item.status.as_str()
            )));
        }

        item.status = ItemStatus::Snoozed;
        item.snoozed_until = Some(command.until);
        item.snooze_count += 1;
        item.action_count += 1;
        item.last_action_date = Some(now);
        // The suggestion trace wins; a plain user reason is kept too.
        if let Some(note) = command.ai_reasoning.or(command.reason) {
            item.ai_reasoning = Some(note);
        }

        self.repo.update(&item).await?;
        debug!(
            item_id = id,
            until = %command.until.to_rfc3339(),
            smart = command.smart,
            "item snoozed"
        );
        Ok(item)
    }

    /// Resurface snoozed items whose time has passed, flipping them
    /// back to pending.
    ///
    /// Idempotent: items already resurfaced are not returned again, so
    /// this is safe to call on a fixed interval with at-least-once
    /// semantics.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn check_snoozed_items(&self) -> Result<Vec<FollowUpItem>> {
        let now = Utc::now();
        let mut resurfaced = Vec::new();

        for mut item in self.repo.due_snoozed(now).await? {
            item.status = ItemStatus::Pending;
            item.snoozed_until = None;
            self.repo.update(&item).await?;
            resurfaced.push(item);
        }

        if !resurfaced.is_empty() {
            debug!(count = resurfaced.len(), "snoozed items resurfaced");
        }
        Ok(resurfaced)
    }

    /// Mark an item completed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or an error if the
    /// database operation fails.
    pub async fn mark_completed(&self, id: i64) -> Result<FollowUpItem> {
        self.finish(id, ItemStatus::Completed).await
    }

    /// Archive an item from any active state.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, a validation error if the
    /// item is already terminal, or an error if the database operation
    /// fails.
    pub async fn archive_item(&self, id: i64) -> Result<FollowUpItem> {
        self.finish(id, ItemStatus::Archived).await
    }

    async fn finish(&self, id: i64, terminal: ItemStatus) -> Result<FollowUpItem> {
        let mut item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("item", id))?;
        if item.status.is_terminal() {
            return Err(Error::Validation(format!(
                "item {id} is already {}",
                item.status.as_str()
            )));
        }

        item.status = terminal;
        // Terminal items carry no meaningful SLA status.
        item.sla_status = None;
        item.snoozed_until = None;
        item.action_count += 1;
        item.last_action_date = Some(Utc::now());

        self.repo.update(&item).await?;
        Ok(item)
    }

    /// Fold a classification result into a queue item, or decline it.
    ///
    /// Low-priority messages that neither need a reply nor merit
    /// attention (newsletters, automated mail, rule-archived messages)
    /// are not admitted and yield `None`. Otherwise the item's SLA
    /// deadline and status are computed before persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn process_new_classification(
        &self,
        classification: &ClassificationResult,
        meta: &EmailContext,
        vip: Option<&VipContact>,
    ) -> Result<Option<i64>> {
        if Self::auto_archive_eligible(classification) {
            debug!(email_id = %meta.id, "classification declined queue admission");
            return Ok(None);
        }

        let vip_hours = vip.and_then(|v| v.sla_hours);
        let deadline =
            self.tracker
                .calculate_deadline(meta.date, classification.priority, vip_hours);
        let sla_status =
            self.tracker
                .status_at(deadline, classification.priority, vip_hours, Utc::now());

        let mut item = FollowUpItem::new(&meta.id, &meta.subject, &meta.from, meta.date);
        item.thread_id.clone_from(&meta.thread_id);
        item.to.clone_from(&meta.to);
        item.priority = classification.priority;
        item.category.clone_from(&classification.category);
        item.labels = classification.labels.clone();
        item.reason = Self::derive_reason(classification);
        item.sla_deadline = Some(deadline);
        item.sla_status = Some(sla_status);
        item.ai_reasoning = Some(classification.reasoning.clone());

        self.add_item(item).await.map(Some)
    }

    /// Very-low-value messages are dropped instead of queued.
    fn auto_archive_eligible(classification: &ClassificationResult) -> bool {
        classification.priority == Priority::Low
            && !classification.needs_reply
            && (classification.is_newsletter
                || classification.is_automated
                || classification
                    .suggested_actions
                    .contains(&SuggestedAction::Archive))
    }

    /// Map classification signals to a queue reason, most specific first.
    fn derive_reason(classification: &ClassificationResult) -> FollowUpReason {
        if classification.is_vip {
            FollowUpReason::VipRequiresAttention
        } else if classification.needs_reply {
            FollowUpReason::NeedsReply
        } else if classification.waiting_on_others {
            FollowUpReason::WaitingOnInfo
        } else if classification
            .suggested_actions
            .contains(&SuggestedAction::SetFollowUp)
        {
            FollowUpReason::FollowUpScheduled
        } else {
            FollowUpReason::RequiresAction
        }
    }

    /// Snooze several items; each id is processed independently and one
    /// failure never aborts the rest.
    pub async fn bulk_snooze(&self, ids: &[i64], until: DateTime<Utc>) -> BulkResult {
        let mut result = BulkResult::default();
        for &id in ids {
            match self.snooze_item(id, SnoozeCommand::until(until)).await {
                Ok(_) => result.successful.push(id),
                Err(e) => result.failed.push(BulkFailure {
                    id,
                    error: e.to_string(),
                }),
            }
        }
        result
    }

    /// Complete several items; each id is processed independently and
    /// one failure never aborts the rest.
    pub async fn bulk_complete(&self, ids: &[i64]) -> BulkResult {
        let mut result = BulkResult::default();
        for &id in ids {
            match self.mark_completed(id).await {
                Ok(_) => result.successful.push(id),
                Err(e) => result.failed.push(BulkFailure {
                    id,
                    error: e.to_string(),
                }),
            }
        }
        result
    }

    /// Aggregate statistics over the whole queue, stamped "as of" now.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_precision_loss)]
    pub async fn statistics(&self) -> Result<QueueStatistics> {
        let now = Utc::now();
        let items = self.repo.list_all().await?;

        let mut stats = QueueStatistics {
            as_of: now,
            total: items.len() as u64,
            ..QueueStatistics::default()
        };

        let mut response_hours: Vec<f32> = Vec::new();
        let mut in_queue_hours: Vec<f32> = Vec::new();
        let mut waiting_hours: Vec<f32> = Vec::new();
        let mut snooze_hours: Vec<f32> = Vec::new();
        let hours_between = |a: DateTime<Utc>, b: DateTime<Utc>| {
            (b - a).num_minutes() as f32 / 60.0
        };

        for item in &items {
            match item.status {
                ItemStatus::Pending => stats.pending += 1,
                ItemStatus::Processing => stats.processing += 1,
                ItemStatus::Completed => stats.completed += 1,
                ItemStatus::Snoozed => stats.snoozed += 1,
                ItemStatus::Archived => stats.archived += 1,
            }

            if item.status.is_terminal() {
                if item.status == ItemStatus::Completed {
                    if let Some(done) = item.last_action_date {
                        response_hours.push(hours_between(item.received_date, done));
                    }
                }
                continue;
            }

            match item.priority {
                Priority::Critical => stats.critical += 1,
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }

            if let Some(deadline) = item.sla_deadline {
                match self.tracker.status_at(deadline, item.priority, None, now) {
                    crate::sla::SlaStatus::OnTime => stats.sla_on_time += 1,
                    crate::sla::SlaStatus::AtRisk => stats.sla_at_risk += 1,
                    crate::sla::SlaStatus::Overdue => stats.sla_overdue += 1,
                }
            }

            in_queue_hours.push(hours_between(item.received_date, now));
            if item.reason == FollowUpReason::WaitingOnInfo {
                waiting_hours.push(hours_between(item.received_date, now));
            }
            if item.status == ItemStatus::Snoozed {
                if let (Some(since), Some(until)) = (item.last_action_date, item.snoozed_until) {
                    snooze_hours.push(hours_between(since, until));
                }
            }
        }

        stats.avg_response_hours = mean(&response_hours);
        stats.avg_time_in_queue_hours = mean(&in_queue_hours);
        stats.avg_waiting_on_info_hours = mean(&waiting_hours);
        stats.avg_snooze_hours = mean(&snooze_hours);
        Ok(stats)
    }
}

/// Mean of a slice, or `None` when empty.
#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeSet;

    use crate::classify::{ClassificationMethod, Sentiment};
    use crate::sla::SlaPolicy;

    async fn queue() -> FollowUpQueue {
        FollowUpQueue::new(
            QueueRepository::in_memory().await.unwrap(),
            SlaTracker::new(SlaPolicy::default()),
        )
    }

    fn classification(email_id: &str) -> ClassificationResult {
        ClassificationResult {
            email_id: email_id.to_string(),
            priority: Priority::High,
            category: "correspondence".to_string(),
            labels: BTreeSet::from(["follow-up".to_string()]),
            needs_reply: true,
            waiting_on_others: false,
            sentiment: Sentiment::Neutral,
            suggested_actions: vec![SuggestedAction::Reply],
            confidence: 0.8,
            method: ClassificationMethod::Rule,
            reasoning: "rule matched".to_string(),
            applied_rules: vec![1],
            is_vip: false,
            feedback_required: false,
            is_newsletter: false,
            is_automated: false,
            is_recurring: false,
        }
    }

    fn context(email_id: &str) -> EmailContext {
        EmailContext::new(email_id, "t1", "Subject", "sender@corp.com", Utc::now())
    }

    #[tokio::test]
    async fn test_add_then_get_is_pending() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let item = q.get_item(id).await.unwrap().unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.action_count, 0);
    }

    #[tokio::test]
    async fn test_update_bumps_action_count() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let item = q
            .update_item(
                id,
                ItemPatch {
                    priority: Some(Priority::Critical),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(item.priority, Priority::Critical);
        assert_eq!(item.action_count, 1);
        assert!(item.last_action_date.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let q = queue().await;
        assert!(matches!(
            q.update_item(999, ItemPatch::default()).await.unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_snooze_requires_future_time() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let err = q
            .snooze_item(id, SnoozeCommand::until(Utc::now() - Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_snooze_resurface_cycle_is_idempotent() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        // Snooze 50ms into the future, then wait it out.
        q.snooze_item(id, SnoozeCommand::until(Utc::now() + Duration::milliseconds(50)))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let resurfaced = q.check_snoozed_items().await.unwrap();
        assert_eq!(resurfaced.len(), 1);
        assert_eq!(resurfaced[0].status, ItemStatus::Pending);
        assert_eq!(resurfaced[0].snooze_count, 1);

        // Second sweep with no time passing returns nothing.
        assert!(q.check_snoozed_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snooze_keeps_user_reason() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let command = SnoozeCommand {
            reason: Some("waiting for the vendor call".to_string()),
            ..SnoozeCommand::until(Utc::now() + Duration::hours(3))
        };
        let item = q.snooze_item(id, command).await.unwrap();
        assert_eq!(
            item.ai_reasoning.as_deref(),
            Some("waiting for the vendor call")
        );
    }

    #[tokio::test]
    async fn test_complete_clears_sla_status() {
        let q = queue().await;
        let mut item = FollowUpItem::new("m1", "S", "a@b.c", Utc::now());
        item.sla_deadline = Some(Utc::now() + Duration::hours(4));
        item.sla_status = Some(crate::sla::SlaStatus::OnTime);
        let id = q.add_item(item).await.unwrap();

        let done = q.mark_completed(id).await.unwrap();
        assert_eq!(done.status, ItemStatus::Completed);
        assert!(done.sla_status.is_none());

        // Completing twice is a validation error, not a silent no-op.
        assert!(matches!(
            q.mark_completed(id).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_archive_from_active() {
        let q = queue().await;
        let id = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let archived = q.archive_item(id).await.unwrap();
        assert_eq!(archived.status, ItemStatus::Archived);
    }

    #[tokio::test]
    async fn test_process_classification_admits_and_computes_sla() {
        let q = queue().await;
        let id = q
            .process_new_classification(&classification("m1"), &context("m1"), None)
            .await
            .unwrap()
            .unwrap();

        let item = q.get_item(id).await.unwrap().unwrap();
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.reason, FollowUpReason::NeedsReply);
        assert!(item.sla_deadline.is_some());
        assert_eq!(item.sla_status, Some(crate::sla::SlaStatus::OnTime));
        assert_eq!(item.ai_reasoning.as_deref(), Some("rule matched"));
    }

    #[tokio::test]
    async fn test_process_classification_declines_low_value() {
        let q = queue().await;
        let mut c = classification("m1");
        c.priority = Priority::Low;
        c.needs_reply = false;
        c.is_newsletter = true;

        let admitted = q
            .process_new_classification(&c, &context("m1"), None)
            .await
            .unwrap();
        assert!(admitted.is_none());
    }

    #[tokio::test]
    async fn test_vip_override_shortens_deadline() {
        let q = queue().await;
        let mut c = classification("m1");
        c.priority = Priority::Low; // base allowance would be 168h
        let vip = crate::vip::VipContact::new("sender@corp.com", crate::vip::VipTier::ONE)
            .with_sla_hours(2.0);

        let meta = context("m1");
        let id = q
            .process_new_classification(&c, &meta, Some(&vip))
            .await
            .unwrap()
            .unwrap();

        let item = q.get_item(id).await.unwrap().unwrap();
        let deadline = item.sla_deadline.unwrap();
        assert_eq!(deadline - meta.date, Duration::hours(2));
    }

    #[tokio::test]
    async fn test_bulk_complete_partial_failure() {
        let q = queue().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                q.add_item(FollowUpItem::new(format!("m{i}"), "S", "a@b.c", Utc::now()))
                    .await
                    .unwrap(),
            );
        }
        ids.push(424_242); // unknown id

        let result = q.bulk_complete(&ids).await;
        assert_eq!(result.successful.len(), 3);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, 424_242);
        assert!(result.failed[0].error.contains("not found"));
    }

    #[tokio::test]
    async fn test_bulk_snooze_partial_failure() {
        let q = queue().await;
        let a = q
            .add_item(FollowUpItem::new("m1", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();
        let b = q
            .add_item(FollowUpItem::new("m2", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();
        let c = q
            .add_item(FollowUpItem::new("m3", "S", "a@b.c", Utc::now()))
            .await
            .unwrap();

        let until = Utc::now() + Duration::hours(3);
        let result = q.bulk_snooze(&[a, b, c, 999], until).await;
        assert_eq!(result.successful, vec![a, b, c]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, 999);
    }

    #[tokio::test]
    async fn test_statistics() {
        let q = queue().await;
        let received = Utc::now() - Duration::hours(10);

        let mut pending = FollowUpItem::new("m1", "S", "a@b.c", received);
        pending.priority = Priority::Critical;
        pending.sla_deadline = Some(Utc::now() - Duration::hours(1));
        pending.reason = FollowUpReason::WaitingOnInfo;
        q.add_item(pending).await.unwrap();

        let done_id = q
            .add_item(FollowUpItem::new("m2", "S", "a@b.c", received))
            .await
            .unwrap();
        q.mark_completed(done_id).await.unwrap();

        let stats = q.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.sla_overdue, 1);
        // The completed item took ~10 hours to resolve.
        let avg = stats.avg_response_hours.unwrap();
        assert!((9.0..=11.0).contains(&avg), "got {avg}");
        assert!(stats.avg_waiting_on_info_hours.is_some());
    }
}
