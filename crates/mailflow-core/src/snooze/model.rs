//! Snooze suggestion models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Priority;

/// One entry in the fixed quick-pick menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickSnoozeOption {
    /// Short display label ("Tomorrow morning").
    pub label: String,
    /// When the item would resurface.
    pub time: DateTime<Utc>,
    /// Why this time, in one phrase.
    pub reason: String,
}

/// What the suggestion engine gets to look at.
#[derive(Debug, Clone)]
pub struct SnoozeRequest {
    /// Subject line of the message being snoozed.
    pub subject: String,
    /// Body text of the message being snoozed.
    pub body: String,
    /// Current priority of the queue item.
    pub priority: Priority,
    /// The caller's "now"; passed in so suggestions are deterministic.
    pub now: DateTime<Utc>,
}

/// A ranked runner-up to the primary suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeAlternative {
    /// Short display label.
    pub label: String,
    /// When the item would resurface.
    pub time: DateTime<Utc>,
}

/// The engine's advice for one snooze. Purely advisory; nothing is
/// mutated until the caller issues an actual snooze command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeSuggestion {
    /// The primary pick.
    pub suggested_time: DateTime<Utc>,
    /// Human-readable explanation of the pick.
    pub reasoning: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Up to three ranked runner-ups.
    pub alternatives: Vec<SnoozeAlternative>,
}
