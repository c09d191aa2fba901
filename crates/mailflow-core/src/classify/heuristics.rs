//! Keyword heuristics for reply detection, urgency, and message kind.

use super::model::Sentiment;
use crate::message::EmailContext;

/// Phrases that signal pressing, time-boxed requests.
const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "right away",
    "emergency",
    "critical",
    "time sensitive",
    "end of day",
    "eod",
];

/// Phrases that usually expect an answer from the reader.
const REPLY_KEYWORDS: &[&str] = &[
    "please reply",
    "please respond",
    "let me know",
    "can you",
    "could you",
    "would you",
    "what do you think",
    "please confirm",
    "please advise",
    "waiting for your",
    "your thoughts",
];

/// Phrases indicating the sender still owes the user something.
const WAITING_KEYWORDS: &[&str] = &[
    "i will get back",
    "i'll get back",
    "will follow up",
    "once i hear back",
    "waiting to hear",
    "checking with",
];

/// Deadline phrasing that raises urgency.
const DEADLINE_KEYWORDS: &[&str] = &[
    "deadline",
    "due by",
    "due date",
    "by friday",
    "by monday",
    "by tomorrow",
    "end of week",
    "no later than",
];

/// Newsletter and subscription markers.
const NEWSLETTER_MARKERS: &[&str] = &["unsubscribe", "newsletter", "view in browser", "digest"];

/// Automated-sender address prefixes.
const AUTOMATED_SENDERS: &[&str] = &[
    "noreply@",
    "no-reply@",
    "donotreply@",
    "notifications@",
    "notification@",
    "alerts@",
    "mailer-daemon@",
];

/// Recurring-series subject markers.
const RECURRING_MARKERS: &[&str] = &[
    "weekly",
    "daily",
    "monthly",
    "quarterly",
    "standup",
    "status report",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "disappointed",
    "unacceptable",
    "frustrated",
    "complaint",
    "escalate",
    "still waiting",
];

const POSITIVE_KEYWORDS: &[&str] = &["thank you", "thanks", "great work", "congratulations", "appreciate"];

/// Everything the keyword pass extracts from one message.
#[derive(Debug, Clone, Default)]
pub struct ContentSignals {
    /// Pressing language present.
    pub is_urgent: bool,
    /// Deadline phrasing present.
    pub mentions_deadline: bool,
    /// The message appears to expect a reply.
    pub needs_reply: bool,
    /// The sender owes the user a response.
    pub sender_owes_reply: bool,
    /// Newsletter or subscription content.
    pub is_newsletter: bool,
    /// Machine-generated message.
    pub is_automated: bool,
    /// Part of a recurring series.
    pub is_recurring: bool,
    /// Detected tone.
    pub sentiment: Sentiment,
}

/// Runs the keyword pass over subject, body, and sender.
#[must_use]
pub fn analyze_content(ctx: &EmailContext) -> ContentSignals {
    let subject = ctx.subject.to_lowercase();
    let body = ctx.body.to_lowercase();
    let from = ctx.from.to_lowercase();
    let text = format!("{subject}\n{body}");

    let contains_any = |haystack: &str, needles: &[&str]| needles.iter().any(|n| haystack.contains(n));

    let is_automated = AUTOMATED_SENDERS.iter().any(|p| from.starts_with(p))
        || body.contains("this is an automated message")
        || body.contains("do not reply to this email");
    let is_newsletter = contains_any(&text, NEWSLETTER_MARKERS);

    let is_urgent = contains_any(&text, URGENT_KEYWORDS);
    let mentions_deadline = contains_any(&text, DEADLINE_KEYWORDS);

    // Question marks in a human message are a strong reply signal, but
    // meaningless in automated mail.
    let asks_question = !is_automated && !is_newsletter && body.contains('?');
    let needs_reply =
        !is_automated && !is_newsletter && (asks_question || contains_any(&text, REPLY_KEYWORDS));

    let sentiment = if is_urgent || mentions_deadline {
        Sentiment::Urgent
    } else if contains_any(&text, NEGATIVE_KEYWORDS) {
        Sentiment::Negative
    } else if contains_any(&text, POSITIVE_KEYWORDS) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    };

    ContentSignals {
        is_urgent,
        mentions_deadline,
        needs_reply,
        sender_owes_reply: contains_any(&body, WAITING_KEYWORDS),
        is_newsletter,
        is_automated,
        is_recurring: contains_any(&subject, RECURRING_MARKERS),
        sentiment,
    }
}
