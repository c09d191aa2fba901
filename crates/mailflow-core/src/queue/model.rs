//! Follow-up queue data models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Priority;
use crate::sla::SlaStatus;

/// Lifecycle state of a queue item.
///
/// `pending -> processing -> completed | archived`, with
/// `pending <-> snoozed` and any active state reachable to `archived`
/// by explicit action. `completed` and `archived` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the user's attention.
    #[default]
    Pending,
    /// Being worked on.
    Processing,
    /// Done; terminal.
    Completed,
    /// Hidden until `snoozed_until` passes.
    Snoozed,
    /// Put away; terminal.
    Archived,
}

impl ItemStatus {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "snoozed" => Self::Snoozed,
            "archived" => Self::Archived,
            _ => Self::Pending,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Snoozed => "snoozed",
            Self::Archived => "archived",
        }
    }

    /// Whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Archived)
    }
}

/// Why a message sits in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpReason {
    /// The message expects a reply from the user.
    NeedsReply,
    /// The user is waiting on information from others.
    WaitingOnInfo,
    /// The message asks for an action other than a reply.
    #[default]
    RequiresAction,
    /// A follow-up was explicitly scheduled.
    FollowUpScheduled,
    /// Delegated to someone else.
    Delegated,
    /// User-supplied reason.
    Custom,
    /// A VIP sender requires attention regardless of content.
    VipRequiresAttention,
}

impl FollowUpReason {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "needs_reply" => Self::NeedsReply,
            "waiting_on_info" => Self::WaitingOnInfo,
            "follow_up_scheduled" => Self::FollowUpScheduled,
            "delegated" => Self::Delegated,
            "custom" => Self::Custom,
            "vip_requires_attention" => Self::VipRequiresAttention,
            _ => Self::RequiresAction,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsReply => "needs_reply",
            Self::WaitingOnInfo => "waiting_on_info",
            Self::RequiresAction => "requires_action",
            Self::FollowUpScheduled => "follow_up_scheduled",
            Self::Delegated => "delegated",
            Self::Custom => "custom",
            Self::VipRequiresAttention => "vip_requires_attention",
        }
    }
}

/// The persisted queue record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpItem {
    /// Unique identifier (assigned by storage).
    pub id: Option<i64>,
    /// Message id in the message store.
    pub email_id: String,
    /// Thread id the message belongs to.
    pub thread_id: String,
    /// Subject line, for display.
    pub subject: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// When the message was received.
    pub received_date: DateTime<Utc>,
    /// Assigned priority.
    pub priority: Priority,
    /// Assigned category.
    pub category: String,
    /// Attached labels.
    pub labels: BTreeSet<String>,
    /// Lifecycle state.
    pub status: ItemStatus,
    /// Why the item is queued.
    pub reason: FollowUpReason,
    /// Response deadline, when tracked.
    pub sla_deadline: Option<DateTime<Utc>>,
    /// Last known SLA status; meaningless (and cleared) once terminal.
    pub sla_status: Option<SlaStatus>,
    /// When a snoozed item resurfaces.
    pub snoozed_until: Option<DateTime<Utc>>,
    /// How many times the item has been snoozed.
    pub snooze_count: u32,
    /// How many mutations the item has received.
    pub action_count: u32,
    /// When the item was last mutated.
    pub last_action_date: Option<DateTime<Utc>>,
    /// Classification reasoning trace, for auditability.
    pub ai_reasoning: Option<String>,
}

impl FollowUpItem {
    /// Creates a pending item with zeroed counters.
    #[must_use]
    pub fn new(
        email_id: impl Into<String>,
        subject: impl Into<String>,
        from: impl Into<String>,
        received_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            email_id: email_id.into(),
            thread_id: String::new(),
            subject: subject.into(),
            from: from.into(),
            to: Vec::new(),
            received_date,
            priority: Priority::Medium,
            category: String::new(),
            labels: BTreeSet::new(),
            status: ItemStatus::Pending,
            reason: FollowUpReason::RequiresAction,
            sla_deadline: None,
            sla_status: None,
            snoozed_until: None,
            snooze_count: 0,
            action_count: 0,
            last_action_date: None,
            ai_reasoning: None,
        }
    }
}

/// Filter for listing active items.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    /// Only items at this priority.
    pub priority: Option<Priority>,
    /// Only items in this state. Defaults to all non-terminal states.
    pub status: Option<ItemStatus>,
    /// Cap on the number of items returned.
    pub limit: Option<u32>,
}

/// A snooze request against one item.
#[derive(Debug, Clone)]
pub struct SnoozeCommand {
    /// When the item should resurface; must be in the future.
    pub until: DateTime<Utc>,
    /// Optional user-facing reason.
    pub reason: Option<String>,
    /// Whether the time came from the smart suggestion path.
    pub smart: bool,
    /// Reasoning trace to attach, if the suggestion carried one.
    pub ai_reasoning: Option<String>,
}

impl SnoozeCommand {
    /// Creates a plain snooze-until command.
    #[must_use]
    pub const fn until(until: DateTime<Utc>) -> Self {
        Self {
            until,
            reason: None,
            smart: false,
            ai_reasoning: None,
        }
    }
}

/// Patch applied by `update_item`; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    /// New priority.
    pub priority: Option<Priority>,
    /// New category.
    pub category: Option<String>,
    /// Replacement label set.
    pub labels: Option<BTreeSet<String>>,
    /// New lifecycle state.
    pub status: Option<ItemStatus>,
    /// New queue reason.
    pub reason: Option<FollowUpReason>,
    /// Replacement reasoning trace.
    pub ai_reasoning: Option<String>,
}

/// Outcome of a bulk operation: per-id successes and failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResult {
    /// Ids the operation succeeded for.
    pub successful: Vec<i64>,
    /// Ids the operation failed for, with the error message.
    pub failed: Vec<BulkFailure>,
}

/// One failed id inside a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    /// The id that failed.
    pub id: i64,
    /// Why it failed.
    pub error: String,
}

/// Aggregate queue counters, stamped with the time they were computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatistics {
    /// When the snapshot was taken.
    pub as_of: DateTime<Utc>,
    /// Total items ever stored.
    pub total: u64,
    /// Items pending.
    pub pending: u64,
    /// Items being processed.
    pub processing: u64,
    /// Items completed.
    pub completed: u64,
    /// Items snoozed.
    pub snoozed: u64,
    /// Items archived.
    pub archived: u64,
    /// Active critical items.
    pub critical: u64,
    /// Active high-priority items.
    pub high: u64,
    /// Active medium-priority items.
    pub medium: u64,
    /// Active low-priority items.
    pub low: u64,
    /// Active items comfortably on time.
    pub sla_on_time: u64,
    /// Active items at risk.
    pub sla_at_risk: u64,
    /// Active items overdue.
    pub sla_overdue: u64,
    /// Mean hours from receipt to completion, over completed items.
    pub avg_response_hours: Option<f32>,
    /// Mean hours active items have been in the queue.
    pub avg_time_in_queue_hours: Option<f32>,
    /// Mean hours waiting-on-info items have been waiting.
    pub avg_waiting_on_info_hours: Option<f32>,
    /// Mean length of currently running snoozes, in hours.
    pub avg_snooze_hours: Option<f32>,
}
