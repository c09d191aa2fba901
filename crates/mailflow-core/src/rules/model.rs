//! Rule data models.

use serde::{Deserialize, Serialize};

/// Message field a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionField {
    /// Subject line.
    Subject,
    /// Sender address.
    From,
    /// Recipient addresses (any recipient may satisfy the condition).
    To,
    /// Plain-text body.
    Body,
}

impl ConditionField {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "subject" => Some(Self::Subject),
            "from" => Some(Self::From),
            "to" => Some(Self::To),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::From => "from",
            Self::To => "to",
            Self::Body => "body",
        }
    }
}

/// String comparison applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field contains the value as a substring.
    Contains,
    /// Field equals the value exactly.
    Equals,
    /// Field starts with the value.
    StartsWith,
    /// Field ends with the value.
    EndsWith,
}

impl ConditionOperator {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "contains" => Some(Self::Contains),
            "equals" => Some(Self::Equals),
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            _ => None,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }

    /// Apply the comparison to a haystack/needle pair.
    #[must_use]
    pub fn apply(&self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Contains => haystack.contains(needle),
            Self::Equals => haystack == needle,
            Self::StartsWith => haystack.starts_with(needle),
            Self::EndsWith => haystack.ends_with(needle),
        }
    }
}

/// One condition inside a rule. All of a rule's conditions must hold
/// for the rule to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Field to inspect.
    pub field: ConditionField,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Value to compare against.
    pub value: String,
    /// Compare case-sensitively. Defaults to false.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl RuleCondition {
    /// Creates a case-insensitive condition.
    #[must_use]
    pub fn new(field: ConditionField, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
            case_sensitive: false,
        }
    }
}

/// Action a matching rule applies to the classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    /// Attach a label (also hints the category).
    Label(String),
    /// Star the message.
    Star,
    /// Forward to the given address.
    Forward(String),
    /// Archive without queueing.
    Archive,
    /// Mark as important.
    MarkImportant,
}

/// A user-defined classification rule.
///
/// Rules are mutable configuration owned by the user; the engine reads
/// them but never edits them during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier (assigned by storage).
    pub id: Option<i64>,
    /// Human-readable name.
    pub name: String,
    /// Evaluation precedence; higher evaluates and wins first.
    pub precedence: i32,
    /// Conditions, all of which must hold (logical AND).
    pub conditions: Vec<RuleCondition>,
    /// Actions applied when the rule matches.
    pub actions: Vec<RuleAction>,
    /// Disabled rules are never evaluated.
    pub enabled: bool,
    /// Match confidence in [0, 1].
    pub confidence: f32,
}

impl Rule {
    /// Creates an enabled rule with clamped confidence.
    #[must_use]
    pub fn new(name: impl Into<String>, precedence: i32, confidence: f32) -> Self {
        Self {
            id: None,
            name: name.into(),
            precedence,
            conditions: Vec::new(),
            actions: Vec::new(),
            enabled: true,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds an action.
    #[must_use]
    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    /// A rule is well-formed when it has at least one condition and no
    /// condition has an empty comparison value.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| !c.value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_roundtrip() {
        for field in [
            ConditionField::Subject,
            ConditionField::From,
            ConditionField::To,
            ConditionField::Body,
        ] {
            assert_eq!(ConditionField::parse(field.as_str()), Some(field));
        }
        assert_eq!(ConditionField::parse("cc"), None);
    }

    #[test]
    fn test_operator_roundtrip() {
        for op in [
            ConditionOperator::Contains,
            ConditionOperator::Equals,
            ConditionOperator::StartsWith,
            ConditionOperator::EndsWith,
        ] {
            assert_eq!(ConditionOperator::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_operator_apply() {
        assert!(ConditionOperator::Contains.apply("hello world", "lo wo"));
        assert!(ConditionOperator::Equals.apply("abc", "abc"));
        assert!(ConditionOperator::StartsWith.apply("abcdef", "abc"));
        assert!(ConditionOperator::EndsWith.apply("abcdef", "def"));
        assert!(!ConditionOperator::EndsWith.apply("abcdef", "abc"));
    }

    #[test]
    fn test_confidence_clamped() {
        assert!((Rule::new("r", 0, 1.5).confidence - 1.0).abs() < f32::EPSILON);
        assert!(Rule::new("r", 0, -0.5).confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_well_formed() {
        let rule = Rule::new("empty", 0, 0.9);
        assert!(!rule.is_well_formed());

        let rule = rule.with_condition(RuleCondition::new(
            ConditionField::Subject,
            ConditionOperator::Contains,
            "urgent",
        ));
        assert!(rule.is_well_formed());

        let bad = Rule::new("blank value", 0, 0.9).with_condition(RuleCondition::new(
            ConditionField::Body,
            ConditionOperator::Contains,
            "",
        ));
        assert!(!bad.is_well_formed());
    }
}
