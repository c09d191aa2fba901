//! Message classification: rule, VIP, and learning signals merged into
//! one result per message.

mod engine;
mod heuristics;
mod model;

pub use engine::{ClassificationEngine, ClassifierConfig};
pub use heuristics::{ContentSignals, analyze_content};
pub use model::{
    AiHint, ClassificationMethod, ClassificationResult, Priority, Sentiment, SuggestedAction,
};
