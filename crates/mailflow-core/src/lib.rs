//! # mailflow-core
//!
//! Triage engine for email: classification, follow-up tracking, and
//! response-time obligations.
//!
//! This crate provides:
//! - **Classification** - rule, VIP, learned, and heuristic signals
//!   merged into one result per message
//! - **Rules** - user-defined condition/action rules with precedence
//! - **VIP Management** - important senders by address or domain glob,
//!   with priority floors and SLA overrides
//! - **Learning** - category suggestions from confirmed examples and a
//!   feedback ledger
//! - **SLA Tracking** - working-hours-aware deadlines and overdue sweeps
//! - **Snooze** - quick picks and content-aware resurface suggestions
//! - **Follow-Up Queue** - the persisted item state machine, bulk
//!   operations, and statistics

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod classify;
mod error;
pub mod learning;
pub mod message;
pub mod queue;
pub mod rules;
pub mod sla;
pub mod snooze;
pub mod vip;

pub use classify::{
    AiHint, ClassificationEngine, ClassificationMethod, ClassificationResult, ClassifierConfig,
    Priority, Sentiment, SuggestedAction,
};
pub use error::{Error, Result};
pub use learning::{
    CategorySuggestion, ClassificationFeedback, FeedbackType, LearningRepository,
    LearningStatistics, LearningSystem, PriorityFactors,
};
pub use message::{EmailContext, ThreadContext};
pub use queue::{
    BulkFailure, BulkResult, FollowUpItem, FollowUpQueue, FollowUpReason, ItemPatch, ItemStatus,
    QueueFilter, QueueRepository, QueueStatistics, SnoozeCommand,
};
pub use rules::{
    ConditionField, ConditionOperator, Rule, RuleAction, RuleCondition, RuleMatch, RuleRepository,
    RuleTieBreak, RulesEngine,
};
pub use sla::{SlaPolicy, SlaStatus, SlaTracker, WorkingHours};
pub use snooze::{
    QuickSnoozeOption, SnoozeAlternative, SnoozeEngine, SnoozeRequest, SnoozeSuggestion,
};
pub use vip::{SenderActivity, VipContact, VipManager, VipRepository, VipSuggestion, VipTier};
