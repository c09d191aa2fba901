//! Learning logic: similarity suggestions, priority scoring, and the
//! feedback loop.

use std::collections::BTreeSet;

use tracing::debug;

use super::model::{
    CategorySuggestion, ClassificationFeedback, FeedbackType, LearningStatistics, PriorityFactors,
};
use super::repository::LearningRepository;
use crate::Result;
use crate::classify::ClassificationResult;

/// Minimum similarity a stored example must clear before its category
/// is suggested.
const MIN_SIMILARITY: f32 = 0.3;
/// Similarity bonus when the example came from the same sender.
const SAME_SENDER_BONUS: f32 = 0.2;
/// How many recent examples are scanned per suggestion.
const EXAMPLE_SCAN_LIMIT: u32 = 200;

/// Fixed weights of the seven priority factors. They sum to 1.
const W_SENDER_IMPORTANCE: f32 = 0.20;
const W_KEYWORD_URGENCY: f32 = 0.20;
const W_DEADLINE_PROXIMITY: f32 = 0.15;
const W_VIP_STATUS: f32 = 0.15;
const W_RESPONSE_RATE: f32 = 0.10;
const W_SENTIMENT_URGENCY: f32 = 0.10;
const W_CONTEXTUAL_CLUES: f32 = 0.10;

/// Records outcomes and corrections, and suggests categories for new
/// messages from historical similarity.
pub struct LearningSystem {
    repo: LearningRepository,
}

impl LearningSystem {
    /// Creates a learning system over the given repository.
    #[must_use]
    pub const fn new(repo: LearningRepository) -> Self {
        Self { repo }
    }

    /// Suggest a category for a new message by token-overlap similarity
    /// against confirmed examples.
    ///
    /// Returns `None` when no example clears the similarity threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn suggest_category(
        &self,
        subject: &str,
        from: &str,
        _body: &str,
    ) -> Result<Option<CategorySuggestion>> {
        let tokens = tokenize(subject);
        if tokens.is_empty() {
            return Ok(None);
        }
        let from = from.to_lowercase();

        let mut best: Option<CategorySuggestion> = None;
        for example in self.repo.recent_examples(EXAMPLE_SCAN_LIMIT).await? {
            let mut similarity = jaccard(&tokens, &tokenize(&example.subject));
            if example.from == from {
                similarity = (similarity + SAME_SENDER_BONUS).min(1.0);
            }
            if similarity >= MIN_SIMILARITY
                && best.as_ref().is_none_or(|b| similarity > b.confidence)
            {
                best = Some(CategorySuggestion {
                    category: example.category,
                    confidence: similarity,
                });
            }
        }

        if let Some(suggestion) = &best {
            debug!(
                category = %suggestion.category,
                confidence = suggestion.confidence,
                "category suggested from historical similarity"
            );
        }
        Ok(best)
    }

    /// Weighted linear combination of the seven priority factors,
    /// yielding a score in [0, 100].
    #[must_use]
    pub fn calculate_priority_score(factors: &PriorityFactors) -> f32 {
        let clamp = |v: f32| v.clamp(0.0, 1.0);
        let score = clamp(factors.sender_importance) * W_SENDER_IMPORTANCE
            + clamp(factors.keyword_urgency) * W_KEYWORD_URGENCY
            + clamp(factors.deadline_proximity) * W_DEADLINE_PROXIMITY
            + clamp(factors.vip_status) * W_VIP_STATUS
            + clamp(factors.historical_response_rate) * W_RESPONSE_RATE
            + clamp(factors.sentiment_urgency) * W_SENTIMENT_URGENCY
            + clamp(factors.contextual_clues) * W_CONTEXTUAL_CLUES;
        (score * 100.0).clamp(0.0, 100.0)
    }

    /// Append a feedback event and update the rolling per-category
    /// accuracy counter. Queue state is never touched here.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record_feedback(
        &self,
        classification: &ClassificationResult,
        feedback: &ClassificationFeedback,
    ) -> Result<()> {
        self.repo.append_feedback(feedback).await?;
        self.repo
            .bump_category(
                &classification.category,
                feedback.feedback_type == FeedbackType::Confirmed,
            )
            .await
    }

    /// Store a confirmed (or corrected) message as a similarity example.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn confirm_example(&self, subject: &str, from: &str, category: &str) -> Result<()> {
        self.repo.add_example(subject, from, category).await?;
        Ok(())
    }

    /// Accuracy for one category as (total, correct) feedback counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn accuracy_for_category(&self, category: &str) -> Result<Option<(u64, u64)>> {
        self.repo.accuracy_for_category(category).await
    }

    /// Aggregate statistics over examples and the feedback ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn statistics(&self) -> Result<LearningStatistics> {
        self.repo.statistics().await
    }
}

/// Lowercased content tokens of length >= 3, minus common filler words.
fn tokenize(text: &str) -> BTreeSet<String> {
    const STOPWORDS: &[&str] = &[
        "the", "and", "for", "with", "your", "from", "that", "this", "are", "you", "have",
        "was", "will", "not", "all", "about",
    ];
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(ToString::to_string)
        .collect()
}

/// Jaccard similarity of two token sets.
#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}
