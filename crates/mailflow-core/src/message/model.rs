//! Message context models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thread-level metadata attached to a message, when the message store
/// has it available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Number of messages in the thread so far.
    pub message_count: u32,
    /// Distinct participants in the thread.
    pub participants: Vec<String>,
    /// Whether the user has already replied somewhere in this thread.
    pub has_user_replied: bool,
}

/// Immutable view of one message, produced by the message store.
///
/// The engine only ever reads from this; it never writes back to the
/// message store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailContext {
    /// Message id in the message store.
    pub id: String,
    /// Thread id the message belongs to.
    pub thread_id: String,
    /// Subject line.
    pub subject: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Date the message was received.
    pub date: DateTime<Utc>,
    /// Plain-text body.
    pub body: String,
    /// Whether the message carries attachments.
    pub has_attachments: bool,
    /// MIME types of any attachments.
    pub attachment_types: Vec<String>,
    /// Thread metadata, when known.
    pub thread: Option<ThreadContext>,
}

impl EmailContext {
    /// Creates a new context with the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        subject: impl Into<String>,
        from: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            subject: subject.into(),
            from: from.into(),
            to: Vec::new(),
            date,
            body: String::new(),
            has_attachments: false,
            attachment_types: Vec::new(),
            thread: None,
        }
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the recipient list.
    #[must_use]
    pub fn with_to(mut self, to: Vec<String>) -> Self {
        self.to = to;
        self
    }

    /// Attaches thread metadata.
    #[must_use]
    pub fn with_thread(mut self, thread: ThreadContext) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Marks the message as carrying attachments of the given types.
    #[must_use]
    pub fn with_attachments(mut self, types: Vec<String>) -> Self {
        self.has_attachments = !types.is_empty();
        self.attachment_types = types;
        self
    }

    /// The sender's domain part, lowercased, if the address has one.
    #[must_use]
    pub fn sender_domain(&self) -> Option<String> {
        self.from
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
    }
}
