//! Feedback-driven learning: correction ledger, accuracy counters, and
//! similarity-based category suggestions.

mod model;
mod repository;
mod system;

pub use model::{
    CategorySuggestion, ClassificationFeedback, FeedbackType, LearningExample,
    LearningStatistics, PriorityFactors,
};
pub use repository::LearningRepository;
pub use system::LearningSystem;
