//! Snooze timing: the quick-pick menu and content-aware suggestions.

mod engine;
mod model;

pub use engine::SnoozeEngine;
pub use model::{QuickSnoozeOption, SnoozeAlternative, SnoozeRequest, SnoozeSuggestion};
