//! The classification pipeline: VIP, rules, learning, heuristics.

use tracing::debug;

use super::heuristics::analyze_content;
use super::model::{
    AiHint, ClassificationMethod, ClassificationResult, Priority, SuggestedAction,
};
use crate::Result;
use crate::learning::{ClassificationFeedback, FeedbackType, LearningSystem};
use crate::message::EmailContext;
use crate::rules::{RuleAction, RuleRepository, RulesEngine};
use crate::vip::VipManager;

/// Thresholds steering the pipeline.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Rule matches below this confidence also consult the learning
    /// system and any summarizer hint.
    pub rule_confidence_threshold: f32,
    /// Learning suggestions and hints below this confidence are ignored.
    pub suggestion_threshold: f32,
    /// Results below this overall confidence are flagged for user review.
    pub feedback_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rule_confidence_threshold: 0.6,
            suggestion_threshold: 0.3,
            feedback_threshold: 0.5,
        }
    }
}

/// Classifies messages by combining the VIP list, stored rules, learned
/// examples, keyword heuristics, and an optional summarizer hint.
///
/// Holds no mutable state; construct once and share by reference.
pub struct ClassificationEngine {
    rules_engine: RulesEngine,
    rule_repo: RuleRepository,
    vips: VipManager,
    learning: LearningSystem,
    config: ClassifierConfig,
}

impl ClassificationEngine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub const fn new(
        rules_engine: RulesEngine,
        rule_repo: RuleRepository,
        vips: VipManager,
        learning: LearningSystem,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            rules_engine,
            rule_repo,
            vips,
            learning,
            config,
        }
    }

    /// The learning system behind this engine.
    #[must_use]
    pub const fn learning(&self) -> &LearningSystem {
        &self.learning
    }

    /// The VIP manager behind this engine.
    #[must_use]
    pub const fn vips(&self) -> &VipManager {
        &self.vips
    }

    /// Classify one message.
    ///
    /// Stages run in fixed order: VIP lookup, rule evaluation, learned
    /// category suggestion and hint merge, keyword heuristics. Each
    /// stage appends to the reasoning trace; suggested actions
    /// accumulate deduplicated across stages. A missing `ai_hint` is
    /// simply degraded operation, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn classify(
        &self,
        ctx: &EmailContext,
        ai_hint: Option<&AiHint>,
    ) -> Result<ClassificationResult> {
        let signals = analyze_content(ctx);
        let mut reasoning: Vec<String> = Vec::new();
        let mut result = ClassificationResult {
            email_id: ctx.id.clone(),
            priority: Priority::Medium,
            category: String::new(),
            labels: std::collections::BTreeSet::new(),
            needs_reply: signals.needs_reply,
            waiting_on_others: signals.sender_owes_reply,
            sentiment: signals.sentiment,
            suggested_actions: Vec::new(),
            confidence: 0.5,
            method: ClassificationMethod::Ai,
            reasoning: String::new(),
            applied_rules: Vec::new(),
            is_vip: false,
            feedback_required: false,
            is_newsletter: signals.is_newsletter,
            is_automated: signals.is_automated,
            is_recurring: signals.is_recurring,
        };

        // Stage 1: VIP lookup. The floor is re-applied at the end so no
        // later stage can undercut it.
        let vip = self.vips.lookup(&ctx.from).await?;
        let vip_floor = vip.as_ref().map(|v| v.tier.priority_floor());
        if let Some(contact) = &vip {
            result.is_vip = true;
            result.push_action(SuggestedAction::MarkImportant);
            reasoning.push(format!(
                "sender matches VIP entry {} (tier {})",
                contact.email_or_pattern,
                contact.tier.get()
            ));
        }

        // Stage 2: stored rules.
        let rules = self.rule_repo.list_enabled().await?;
        let matches = self.rules_engine.evaluate(&rules, ctx);
        let mut rule_fired = false;
        if let Some(top) = matches.first() {
            rule_fired = true;
            result.confidence = top.confidence;
            result.method = ClassificationMethod::Rule;
            result.applied_rules = matches.iter().filter_map(|m| m.rule.id).collect();
            for action in &top.rule.actions {
                apply_rule_action(&mut result, action);
            }
            reasoning.push(format!(
                "rule '{}' matched with confidence {:.2}",
                top.rule.name, top.confidence
            ));
        }

        // Stage 3: learned suggestion and summarizer hint. Consulted
        // when no rule decided the category with enough confidence.
        // Merged contributions average, weighted by confidence; an
        // already-assigned category is never overwritten.
        if !rule_fired || result.confidence < self.config.rule_confidence_threshold {
            let suggestion = self
                .learning
                .suggest_category(&ctx.subject, &ctx.from, &ctx.body)
                .await?;
            if let Some(s) = suggestion {
                if s.confidence >= self.config.suggestion_threshold {
                    if result.category.is_empty() {
                        result.category.clone_from(&s.category);
                    }
                    result.confidence = merge_confidence(result.confidence, s.confidence);
                    result.method = ClassificationMethod::Hybrid;
                    reasoning.push(format!(
                        "resembles past '{}' messages (similarity {:.2})",
                        s.category, s.confidence
                    ));
                }
            }

            if let Some(hint) = ai_hint {
                if hint.confidence >= self.config.suggestion_threshold {
                    if result.category.is_empty() {
                        result.category.clone_from(&hint.category);
                    }
                    if let Some(p) = hint.priority {
                        result.priority = result.priority.floored_at(p);
                    }
                    result.confidence = merge_confidence(result.confidence, hint.confidence);
                    result.method = if rule_fired
                        || result.method == ClassificationMethod::Hybrid
                    {
                        ClassificationMethod::Hybrid
                    } else {
                        ClassificationMethod::Ai
                    };
                    reasoning.push(format!(
                        "summarizer suggests '{}' (confidence {:.2})",
                        hint.category, hint.confidence
                    ));
                }
            }
        }

        // Stage 4: keyword heuristics and thread metadata.
        if signals.is_urgent {
            result.priority = result.priority.floored_at(Priority::High);
            result.push_action(SuggestedAction::Star);
            reasoning.push("urgent language detected".to_string());
        }
        if signals.mentions_deadline {
            result.priority = result.priority.floored_at(Priority::High);
            result.push_action(SuggestedAction::SetFollowUp);
            reasoning.push("deadline mentioned".to_string());
        }
        if signals.is_urgent && signals.mentions_deadline {
            result.priority = result.priority.floored_at(Priority::Critical);
        }
        if (signals.is_newsletter || signals.is_automated) && !result.is_vip && !rule_fired {
            result.priority = Priority::Low;
            reasoning.push(if signals.is_newsletter {
                "newsletter content".to_string()
            } else {
                "automated sender".to_string()
            });
        }
        if ctx.thread.as_ref().is_some_and(|t| t.has_user_replied) {
            // The ball is in the other court only until the user speaks.
            result.waiting_on_others = false;
        }
        if result.needs_reply {
            result.push_action(SuggestedAction::Reply);
        }
        if result.waiting_on_others {
            result.push_action(SuggestedAction::SetFollowUp);
        }
        if result.priority == Priority::Low
            && !result.needs_reply
            && (result.is_newsletter || result.is_automated)
        {
            result.push_action(SuggestedAction::Archive);
        }
        if result.category.is_empty() {
            result.category = baseline_category(&result).to_string();
        }

        // Final: enforce the VIP floor, clamp, decide review.
        if let Some(floor) = vip_floor {
            result.priority = result.priority.floored_at(floor);
        }
        result.confidence = result.confidence.clamp(0.0, 1.0);
        result.feedback_required =
            result.is_vip || result.confidence < self.config.feedback_threshold;
        result.reasoning = reasoning.join("; ");

        debug!(
            email_id = %result.email_id,
            priority = result.priority.as_str(),
            category = %result.category,
            confidence = result.confidence,
            "message classified"
        );
        Ok(result)
    }

    /// Record user feedback on a classification.
    ///
    /// Confirmations and category corrections also feed a training
    /// example so future suggestions improve.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn record_feedback(
        &self,
        classification: &ClassificationResult,
        feedback: &ClassificationFeedback,
        ctx: &EmailContext,
    ) -> Result<()> {
        self.learning.record_feedback(classification, feedback).await?;

        match feedback.feedback_type {
            FeedbackType::Confirmed => {
                self.learning
                    .confirm_example(&ctx.subject, &ctx.from, &classification.category)
                    .await?;
            }
            FeedbackType::WrongCategory => {
                if let Some(correct) = &feedback.correct_value {
                    self.learning
                        .confirm_example(&ctx.subject, &ctx.from, correct)
                        .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Average of two confidences, weighted by themselves, so the stronger
/// signal dominates without either being discarded.
fn merge_confidence(a: f32, b: f32) -> f32 {
    let total = a + b;
    if total <= f32::EPSILON {
        0.0
    } else {
        a.mul_add(a, b * b) / total
    }
}

/// Fallback category when no rule, example, or hint supplied one.
const fn baseline_category(result: &ClassificationResult) -> &'static str {
    if result.is_newsletter {
        "newsletters"
    } else if result.is_automated {
        "notifications"
    } else {
        "correspondence"
    }
}

/// Translate a stored rule action into the result's suggestion space.
fn apply_rule_action(result: &mut ClassificationResult, action: &RuleAction) {
    match action {
        RuleAction::Label(label) => {
            result.labels.insert(label.clone());
            result.push_action(SuggestedAction::Label(label.clone()));
        }
        RuleAction::Star => result.push_action(SuggestedAction::Star),
        RuleAction::Forward(to) => result.push_action(SuggestedAction::Forward(to.clone())),
        RuleAction::Archive => result.push_action(SuggestedAction::Archive),
        RuleAction::MarkImportant => result.push_action(SuggestedAction::MarkImportant),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::learning::LearningRepository;
    use crate::message::ThreadContext;
    use crate::rules::{
        ConditionField, ConditionOperator, Rule, RuleCondition, RuleTieBreak,
    };
    use crate::vip::{VipContact, VipRepository, VipTier};

    async fn engine() -> ClassificationEngine {
        ClassificationEngine::new(
            RulesEngine::new(RuleTieBreak::EarlierCreated),
            RuleRepository::in_memory().await.unwrap(),
            VipManager::new(VipRepository::in_memory().await.unwrap()),
            LearningSystem::new(LearningRepository::in_memory().await.unwrap()),
            ClassifierConfig::default(),
        )
    }

    fn ctx(subject: &str, from: &str, body: &str) -> EmailContext {
        EmailContext::new("m1", "t1", subject, from, Utc::now()).with_body(body)
    }

    #[tokio::test]
    async fn test_vip_floor_applies() {
        let e = engine().await;
        e.vips()
            .add_vip(&VipContact::new("boss@corp.com", VipTier::ONE))
            .await
            .unwrap();

        let result = e
            .classify(&ctx("Quick note", "boss@corp.com", "No rush on this."), None)
            .await
            .unwrap();
        assert!(result.is_vip);
        assert_eq!(result.priority, Priority::Critical);
        assert!(result.feedback_required);
        assert!(result.suggested_actions.contains(&SuggestedAction::MarkImportant));
    }

    #[tokio::test]
    async fn test_rule_match_applies_actions() {
        let e = engine().await;
        let mut rule = Rule::new("invoices", 10, 0.9).with_condition(RuleCondition::new(
            ConditionField::Subject,
            ConditionOperator::Contains,
            "invoice",
        ));
        rule.actions.push(RuleAction::Label("finance".to_string()));
        rule.actions.push(RuleAction::Star);
        e.rule_repo.insert(&rule).await.unwrap();

        let result = e
            .classify(&ctx("Invoice #42", "vendor@x.com", "Attached."), None)
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Rule);
        assert!(result.labels.contains("finance"));
        assert!(result.suggested_actions.contains(&SuggestedAction::Star));
        assert_eq!(result.applied_rules.len(), 1);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hint_alone_is_ai_method() {
        let e = engine().await;
        let hint = AiHint {
            category: "travel".to_string(),
            priority: Some(Priority::High),
            confidence: 0.8,
        };

        let result = e
            .classify(&ctx("Trip", "agent@travel.com", "Itinerary enclosed."), Some(&hint))
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Ai);
        assert_eq!(result.category, "travel");
        assert_eq!(result.priority, Priority::High);
    }

    #[tokio::test]
    async fn test_missing_hint_degrades_gracefully() {
        let e = engine().await;
        let result = e
            .classify(&ctx("Hello", "friend@x.com", "Just saying hi."), None)
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Ai);
        assert_eq!(result.category, "correspondence");
        assert_eq!(result.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_newsletter_demoted_and_archived() {
        let e = engine().await;
        let result = e
            .classify(
                &ctx(
                    "Weekly digest",
                    "news@letter.com",
                    "Top stories. Unsubscribe here.",
                ),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.priority, Priority::Low);
        assert_eq!(result.category, "newsletters");
        assert!(result.is_newsletter);
        assert!(result.suggested_actions.contains(&SuggestedAction::Archive));
    }

    #[tokio::test]
    async fn test_urgent_deadline_escalates_to_critical() {
        let e = engine().await;
        let result = e
            .classify(
                &ctx(
                    "URGENT: contract",
                    "legal@corp.com",
                    "Deadline is Friday, we need this signed asap.",
                ),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.priority, Priority::Critical);
        assert!(result.suggested_actions.contains(&SuggestedAction::SetFollowUp));
    }

    #[tokio::test]
    async fn test_user_reply_clears_waiting() {
        let e = engine().await;
        let thread = ThreadContext {
            message_count: 3,
            participants: vec!["legal@corp.com".to_string()],
            has_user_replied: true,
        };
        let msg = ctx(
            "Re: contract",
            "legal@corp.com",
            "I'll get back to you once I hear from counsel.",
        )
        .with_thread(thread);

        let result = e.classify(&msg, None).await.unwrap();
        assert!(!result.waiting_on_others);
    }

    #[tokio::test]
    async fn test_low_confidence_requires_feedback() {
        let e = engine().await;
        let hint = AiHint {
            category: "misc".to_string(),
            priority: None,
            confidence: 0.35,
        };
        let result = e
            .classify(&ctx("FYI", "colleague@corp.com", "See below."), Some(&hint))
            .await
            .unwrap();
        assert!(result.confidence < 0.5);
        assert!(result.feedback_required);
    }

    #[tokio::test]
    async fn test_record_feedback_confirmed_adds_example() {
        let e = engine().await;
        let result = e
            .classify(&ctx("Invoice #42", "vendor@x.com", "Attached."), None)
            .await
            .unwrap();

        let feedback = ClassificationFeedback::new("m1", FeedbackType::Confirmed);
        e.record_feedback(&result, &feedback, &ctx("Invoice #42", "vendor@x.com", "Attached."))
            .await
            .unwrap();

        let (total, correct) = e
            .learning()
            .accuracy_for_category(&result.category)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(correct, 1);
    }

    #[test]
    fn test_merge_confidence_favors_stronger_signal() {
        let merged = merge_confidence(0.9, 0.3);
        assert!(merged > 0.6 && merged < 0.9, "got {merged}");
        assert!(merge_confidence(0.0, 0.0).abs() < f32::EPSILON);
    }
}
