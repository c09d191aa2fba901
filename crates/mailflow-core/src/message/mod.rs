//! Read-only view of a message handed to the classifier.

mod model;

pub use model::{EmailContext, ThreadContext};
