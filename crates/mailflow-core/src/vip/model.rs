//! VIP data models.

use serde::{Deserialize, Serialize};

use crate::classify::Priority;

/// Importance tier of a VIP sender. Tier 1 is highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VipTier(u8);

impl VipTier {
    /// Highest importance.
    pub const ONE: Self = Self(1);
    /// Middle importance.
    pub const TWO: Self = Self(2);
    /// Lowest VIP importance.
    pub const THREE: Self = Self(3);

    /// Creates a tier, clamping out-of-range values into 1..=3.
    #[must_use]
    pub const fn new(tier: u8) -> Self {
        if tier < 1 {
            Self(1)
        } else if tier > 3 {
            Self(3)
        } else {
            Self(tier)
        }
    }

    /// The raw tier number (1..=3).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Minimum priority a message from this tier may be classified at.
    #[must_use]
    pub const fn priority_floor(self) -> Priority {
        match self.0 {
            1 => Priority::Critical,
            2 => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// An important sender, identified by exact address or `*@domain` glob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipContact {
    /// Exact email address or a `*@domain` pattern.
    pub email_or_pattern: String,
    /// Display name for dashboards.
    pub display_name: Option<String>,
    /// Importance tier (1 highest).
    pub tier: VipTier,
    /// Whether reply drafts should be prepared automatically.
    pub auto_draft: bool,
    /// SLA allowance override in hours; replaces the priority-based
    /// allowance entirely when present.
    pub sla_hours: Option<f32>,
}

impl VipContact {
    /// Creates a contact with the address normalized to lowercase.
    #[must_use]
    pub fn new(email_or_pattern: &str, tier: VipTier) -> Self {
        Self {
            email_or_pattern: email_or_pattern.to_lowercase(),
            display_name: None,
            tier,
            auto_draft: false,
            sla_hours: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the SLA override in hours.
    #[must_use]
    pub const fn with_sla_hours(mut self, hours: f32) -> Self {
        self.sla_hours = Some(hours);
        self
    }

    /// Whether this entry is a `*@domain` glob rather than an exact address.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        self.email_or_pattern.starts_with("*@")
    }

    /// Whether this entry matches the given sender address.
    ///
    /// A `*@domain` glob matches the domain itself and its subdomains.
    #[must_use]
    pub fn matches(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        if let Some(pattern_domain) = self.email_or_pattern.strip_prefix("*@") {
            let Some((_, domain)) = email.rsplit_once('@') else {
                return false;
            };
            domain == pattern_domain || domain.ends_with(&format!(".{pattern_domain}"))
        } else {
            email == self.email_or_pattern
        }
    }
}

/// Observed correspondence volume for one sender, supplied by the
/// caller when asking for VIP suggestions.
#[derive(Debug, Clone)]
pub struct SenderActivity {
    /// Sender address.
    pub email: String,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Messages received from this sender.
    pub message_count: u32,
    /// Replies the user has sent to this sender.
    pub reply_count: u32,
}

/// A non-binding recommendation to tag a sender as VIP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipSuggestion {
    /// Sender address.
    pub email: String,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Suggested tier.
    pub suggested_tier: VipTier,
    /// Human-readable justification.
    pub reason: String,
}
