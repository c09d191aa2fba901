//! Learning system data models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the user said about a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// The assigned priority was wrong.
    WrongPriority,
    /// The assigned category was wrong.
    WrongCategory,
    /// The needs-reply flag was wrong.
    WrongNeedsReply,
    /// The message should not have been queued at all.
    ShouldNotHaveQueued,
    /// The classification was correct.
    Confirmed,
}

impl FeedbackType {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "wrong_priority" => Some(Self::WrongPriority),
            "wrong_category" => Some(Self::WrongCategory),
            "wrong_needs_reply" => Some(Self::WrongNeedsReply),
            "should_not_have_queued" => Some(Self::ShouldNotHaveQueued),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WrongPriority => "wrong_priority",
            Self::WrongCategory => "wrong_category",
            Self::WrongNeedsReply => "wrong_needs_reply",
            Self::ShouldNotHaveQueued => "should_not_have_queued",
            Self::Confirmed => "confirmed",
        }
    }
}

/// A write-once correction or confirmation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationFeedback {
    /// Message the feedback refers to.
    pub email_id: String,
    /// When the feedback was given.
    pub timestamp: DateTime<Utc>,
    /// Kind of feedback.
    pub feedback_type: FeedbackType,
    /// The corrected value, for `Wrong*` feedback.
    pub correct_value: Option<String>,
    /// Free-form note on what the user actually did.
    pub user_action: Option<String>,
}

impl ClassificationFeedback {
    /// Creates a feedback event stamped now.
    #[must_use]
    pub fn new(email_id: impl Into<String>, feedback_type: FeedbackType) -> Self {
        Self {
            email_id: email_id.into(),
            timestamp: Utc::now(),
            feedback_type,
            correct_value: None,
            user_action: None,
        }
    }

    /// Attaches the corrected value.
    #[must_use]
    pub fn with_correct_value(mut self, value: impl Into<String>) -> Self {
        self.correct_value = Some(value.into());
        self
    }
}

/// A confirmed classification example used for similarity lookups.
#[derive(Debug, Clone)]
pub struct LearningExample {
    /// Unique identifier (assigned by storage).
    pub id: Option<i64>,
    /// Subject of the example message.
    pub subject: String,
    /// Sender of the example message.
    pub from: String,
    /// Confirmed category.
    pub category: String,
}

/// A category suggestion derived from historical similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySuggestion {
    /// Suggested category.
    pub category: String,
    /// Similarity-derived confidence in [0, 1].
    pub confidence: f32,
}

/// The seven priority factors, each pre-computed by the caller in [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityFactors {
    /// How important the sender historically is.
    pub sender_importance: f32,
    /// Urgency keywords present in the message.
    pub keyword_urgency: f32,
    /// How close a mentioned deadline is.
    pub deadline_proximity: f32,
    /// Whether the sender is a VIP.
    pub vip_status: f32,
    /// How often the user historically responds to this sender.
    pub historical_response_rate: f32,
    /// Urgency of the detected sentiment.
    pub sentiment_urgency: f32,
    /// Other contextual signals (thread activity, attachments).
    pub contextual_clues: f32,
}

/// Aggregate view of the feedback ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningStatistics {
    /// Confirmed examples stored.
    pub total_examples: u64,
    /// Percentage of classifications the user confirmed, over all
    /// feedback received.
    pub overall_accuracy_pct: f32,
    /// Distinct categories seen across examples.
    pub category_count: u64,
    /// Feedback events per feedback type.
    pub feedback_histogram: BTreeMap<String, u64>,
}
