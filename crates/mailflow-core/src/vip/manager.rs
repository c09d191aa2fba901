//! VIP lookup and suggestion logic.

use tracing::debug;

use super::model::{SenderActivity, VipContact, VipSuggestion, VipTier};
use super::repository::VipRepository;
use crate::Result;

/// Message volume above which a sender becomes a VIP candidate.
const SUGGESTION_MIN_MESSAGES: u32 = 5;
/// Volume above which tier 2 is suggested instead of tier 3.
const TIER_TWO_MESSAGES: u32 = 20;

/// Maintains the tiered VIP list and answers sender lookups.
pub struct VipManager {
    repo: VipRepository,
}

impl VipManager {
    /// Creates a manager over the given repository.
    #[must_use]
    pub const fn new(repo: VipRepository) -> Self {
        Self { repo }
    }

    /// Look up a sender address against the VIP set.
    ///
    /// Exact address entries win over `*@domain` globs; when several
    /// globs apply, the highest tier (lowest tier number) wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn lookup(&self, email: &str) -> Result<Option<VipContact>> {
        if let Some(exact) = self.repo.get(email).await? {
            if !exact.is_pattern() {
                return Ok(Some(exact));
            }
        }

        let best = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|c| c.is_pattern() && c.matches(email))
            .min_by_key(|c| c.tier);

        if let Some(contact) = &best {
            debug!(email, pattern = %contact.email_or_pattern, "sender matched VIP pattern");
        }
        Ok(best)
    }

    /// Add or update a VIP contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_vip(&self, contact: &VipContact) -> Result<()> {
        self.repo.upsert(contact).await
    }

    /// Remove a VIP contact by address or pattern.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such contact exists, or an error if the
    /// database operation fails.
    pub async fn remove_vip(&self, email_or_pattern: &str) -> Result<()> {
        self.repo.delete(email_or_pattern).await
    }

    /// List the full VIP set, highest tier first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<VipContact>> {
        self.repo.list().await
    }

    /// Suggest VIP candidates from observed correspondence volume.
    ///
    /// Frequent correspondents not yet tagged are recommended with a
    /// tier derived from message volume. Tier 1 is never suggested
    /// automatically. The result is advisory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn suggest_vips(&self, activity: &[SenderActivity]) -> Result<Vec<VipSuggestion>> {
        let mut suggestions = Vec::new();

        for sender in activity {
            if sender.message_count < SUGGESTION_MIN_MESSAGES {
                continue;
            }
            if self.lookup(&sender.email).await?.is_some() {
                continue;
            }

            let suggested_tier = if sender.message_count >= TIER_TWO_MESSAGES {
                VipTier::TWO
            } else {
                VipTier::THREE
            };
            suggestions.push(VipSuggestion {
                email: sender.email.to_lowercase(),
                display_name: sender.display_name.clone(),
                suggested_tier,
                reason: format!(
                    "{} messages received, {} replies sent",
                    sender.message_count, sender.reply_count
                ),
            });
        }

        suggestions.sort_by(|a, b| a.suggested_tier.cmp(&b.suggested_tier));
        Ok(suggestions)
    }
}
