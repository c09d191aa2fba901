//! Classification result models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Message priority. Ordering puts `Critical` highest so priorities can
/// be compared and floored directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait a week.
    Low,
    /// Default for ordinary correspondence.
    #[default]
    Medium,
    /// Should be handled within a day.
    High,
    /// Needs attention within hours.
    Critical,
}

impl Priority {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Raise this priority to at least `floor`.
    #[must_use]
    pub fn floored_at(self, floor: Self) -> Self {
        self.max(floor)
    }
}

/// Overall tone detected in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Pressing language, demands immediate handling.
    Urgent,
    /// Friendly or appreciative.
    Positive,
    /// Nothing notable.
    #[default]
    Neutral,
    /// Complaint or frustration.
    Negative,
}

/// How the classification was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    /// A stored rule decided the outcome.
    Rule,
    /// Heuristic baseline or external summarizer hint.
    Ai,
    /// Rule/VIP signals combined with learned or AI suggestions.
    Hybrid,
}

/// A recommended next step, accumulated from every stage that fired.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Attach a label.
    Label(String),
    /// Star the message.
    Star,
    /// Forward to the given address.
    Forward(String),
    /// Archive without follow-up.
    Archive,
    /// Mark as important.
    MarkImportant,
    /// Compose a reply.
    Reply,
    /// Schedule a follow-up.
    SetFollowUp,
}

/// Category/priority hint from the optional external summarizer.
///
/// A missing or failed summarizer is simply "no hint", never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiHint {
    /// Suggested category.
    pub category: String,
    /// Suggested priority, when the summarizer ventured one.
    pub priority: Option<Priority>,
    /// Hint confidence in [0, 1].
    pub confidence: f32,
}

/// The outcome of classifying one message.
///
/// Immutable after return; it is folded into a queue item rather than
/// persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Message id this result describes.
    pub email_id: String,
    /// Assigned priority.
    pub priority: Priority,
    /// Free-form category.
    pub category: String,
    /// Labels to attach.
    pub labels: BTreeSet<String>,
    /// The message appears to expect a reply from the user.
    pub needs_reply: bool,
    /// The user is waiting on someone else in this thread.
    pub waiting_on_others: bool,
    /// Detected tone.
    pub sentiment: Sentiment,
    /// Recommended next steps, deduplicated, in the order stages fired.
    pub suggested_actions: Vec<SuggestedAction>,
    /// Overall confidence in [0, 1].
    pub confidence: f32,
    /// How the result was produced.
    pub method: ClassificationMethod,
    /// Human-readable trace of every stage's contribution.
    pub reasoning: String,
    /// Ids of the rules that matched.
    pub applied_rules: Vec<i64>,
    /// The sender is on the VIP list.
    pub is_vip: bool,
    /// The user should be asked to confirm or correct this result.
    pub feedback_required: bool,
    /// Looks like a newsletter or subscription.
    pub is_newsletter: bool,
    /// Looks machine-generated (notifications, receipts).
    pub is_automated: bool,
    /// Part of a recurring series (digests, standing reports).
    pub is_recurring: bool,
}

impl ClassificationResult {
    /// Appends a suggested action unless an equal one is already present.
    pub fn push_action(&mut self, action: SuggestedAction) {
        if !self.suggested_actions.contains(&action) {
            self.suggested_actions.push(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_roundtrip() {
        for priority in [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ] {
            assert_eq!(Priority::parse(priority.as_str()), priority);
        }
        assert_eq!(Priority::parse("garbage"), Priority::Medium);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_floored_at() {
        assert_eq!(Priority::Low.floored_at(Priority::High), Priority::High);
        assert_eq!(
            Priority::Critical.floored_at(Priority::Medium),
            Priority::Critical
        );
    }
}
