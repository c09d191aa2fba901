//! Rule evaluation.

use tracing::warn;

use super::model::{ConditionField, Rule, RuleCondition};
use crate::message::EmailContext;

/// Tie-break applied when two matching rules share the same precedence
/// and confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleTieBreak {
    /// The earlier-created rule (lower id) wins.
    #[default]
    EarlierCreated,
    /// The later-created rule (higher id) wins.
    LaterCreated,
}

/// One rule that matched a message.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// The matching rule.
    pub rule: Rule,
    /// Confidence of the match, in [0, 1].
    pub confidence: f32,
    /// Indices into `rule.conditions` that evaluated true (all of them,
    /// by definition of a match).
    pub matched_conditions: Vec<usize>,
}

/// Evaluates the stored rule set against messages.
///
/// Evaluation has no side effects; a malformed rule is skipped with a
/// log entry and never aborts evaluation of the remaining rules.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    tie_break: RuleTieBreak,
}

impl RulesEngine {
    /// Creates an engine with the given tie-break policy.
    #[must_use]
    pub const fn new(tie_break: RuleTieBreak) -> Self {
        Self { tie_break }
    }

    /// Evaluates every enabled rule against the message.
    ///
    /// A rule matches only when every condition holds. Matches are
    /// returned sorted by precedence descending, then confidence
    /// descending, then the configured tie-break.
    #[must_use]
    pub fn evaluate(&self, rules: &[Rule], ctx: &EmailContext) -> Vec<RuleMatch> {
        let mut matches: Vec<RuleMatch> = Vec::new();

        for rule in rules.iter().filter(|r| r.enabled) {
            if !rule.is_well_formed() {
                warn!(rule = %rule.name, "skipping malformed rule");
                continue;
            }
            if rule.conditions.iter().all(|c| condition_holds(c, ctx)) {
                matches.push(RuleMatch {
                    rule: rule.clone(),
                    confidence: rule.confidence.clamp(0.0, 1.0),
                    matched_conditions: (0..rule.conditions.len()).collect(),
                });
            }
        }

        let tie_break = self.tie_break;
        matches.sort_by(|a, b| {
            b.rule
                .precedence
                .cmp(&a.rule.precedence)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| {
                    let (x, y) = (a.rule.id.unwrap_or(i64::MAX), b.rule.id.unwrap_or(i64::MAX));
                    match tie_break {
                        RuleTieBreak::EarlierCreated => x.cmp(&y),
                        RuleTieBreak::LaterCreated => y.cmp(&x),
                    }
                })
        });
        matches
    }
}

/// Evaluates one condition against the message.
///
/// A condition whose target field is absent evaluates to false rather
/// than erroring. For `To`, any recipient may satisfy the condition.
fn condition_holds(condition: &RuleCondition, ctx: &EmailContext) -> bool {
    let compare = |haystack: &str| {
        if condition.case_sensitive {
            condition.operator.apply(haystack, &condition.value)
        } else {
            condition
                .operator
                .apply(&haystack.to_lowercase(), &condition.value.to_lowercase())
        }
    };

    match condition.field {
        ConditionField::Subject => !ctx.subject.is_empty() && compare(&ctx.subject),
        ConditionField::From => !ctx.from.is_empty() && compare(&ctx.from),
        ConditionField::To => ctx.to.iter().any(|addr| compare(addr)),
        ConditionField::Body => !ctx.body.is_empty() && compare(&ctx.body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::{ConditionOperator, RuleAction};
    use chrono::Utc;

    fn ctx() -> EmailContext {
        EmailContext::new(
            "m1",
            "t1",
            "URGENT: server down",
            "ops@example.com",
            Utc::now(),
        )
        .with_to(vec!["me@corp.com".to_string()])
        .with_body("The production server is down, please respond.")
    }

    fn subject_rule(name: &str, precedence: i32, needle: &str, confidence: f32) -> Rule {
        Rule::new(name, precedence, confidence).with_condition(RuleCondition::new(
            ConditionField::Subject,
            ConditionOperator::Contains,
            needle,
        ))
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let rule = subject_rule("ops", 10, "urgent", 0.9).with_condition(RuleCondition::new(
            ConditionField::From,
            ConditionOperator::EndsWith,
            "@nowhere.com",
        ));

        let engine = RulesEngine::default();
        assert!(engine.evaluate(&[rule], &ctx()).is_empty());
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let engine = RulesEngine::default();
        let matches = engine.evaluate(&[subject_rule("u", 10, "urgent", 0.9)], &ctx());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_conditions, vec![0]);
    }

    #[test]
    fn test_case_sensitive_flag() {
        let mut rule = subject_rule("u", 10, "urgent", 0.9);
        rule.conditions[0].case_sensitive = true;

        let engine = RulesEngine::default();
        assert!(engine.evaluate(&[rule], &ctx()).is_empty());
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let mut rule = subject_rule("u", 10, "urgent", 0.9);
        rule.enabled = false;

        let engine = RulesEngine::default();
        assert!(engine.evaluate(&[rule], &ctx()).is_empty());
    }

    #[test]
    fn test_malformed_rule_skipped_not_fatal() {
        let malformed = Rule::new("no conditions", 100, 0.9).with_action(RuleAction::Star);
        let good = subject_rule("good", 10, "urgent", 0.8);

        let engine = RulesEngine::default();
        let matches = engine.evaluate(&[malformed, good], &ctx());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule.name, "good");
    }

    #[test]
    fn test_precedence_ordering() {
        // Rule A: precedence 100 on subject; rule B: precedence 90 on
        // sender domain. Both match; A must come first.
        let a = subject_rule("A", 100, "urgent", 0.7);
        let b = Rule::new("B", 90, 0.9).with_condition(RuleCondition::new(
            ConditionField::From,
            ConditionOperator::EndsWith,
            "@example.com",
        ));

        let engine = RulesEngine::default();
        let matches = engine.evaluate(&[b, a], &ctx());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].rule.name, "A");
        assert_eq!(matches[1].rule.name, "B");
    }

    #[test]
    fn test_equal_precedence_earlier_created_wins() {
        let mut a = subject_rule("first", 50, "urgent", 0.8);
        a.id = Some(1);
        let mut b = subject_rule("second", 50, "server", 0.8);
        b.id = Some(2);

        let engine = RulesEngine::new(RuleTieBreak::EarlierCreated);
        let matches = engine.evaluate(&[b.clone(), a.clone()], &ctx());
        assert_eq!(matches[0].rule.name, "first");

        let engine = RulesEngine::new(RuleTieBreak::LaterCreated);
        let matches = engine.evaluate(&[b, a], &ctx());
        assert_eq!(matches[0].rule.name, "second");
    }

    #[test]
    fn test_absent_field_is_false() {
        let rule = Rule::new("body", 10, 0.9).with_condition(RuleCondition::new(
            ConditionField::Body,
            ConditionOperator::Contains,
            "anything",
        ));
        let empty_body = EmailContext::new("m", "t", "subject", "a@b.c", Utc::now());

        let engine = RulesEngine::default();
        assert!(engine.evaluate(&[rule], &empty_body).is_empty());
    }
}
