//! User-defined classification rules and their evaluation engine.

mod engine;
mod model;
mod repository;

pub use engine::{RuleMatch, RuleTieBreak, RulesEngine};
pub use model::{ConditionField, ConditionOperator, Rule, RuleAction, RuleCondition};
pub use repository::RuleRepository;
