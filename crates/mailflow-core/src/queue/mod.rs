//! The follow-up queue: persisted items, state machine, bulk
//! operations, and aggregate statistics.

mod model;
mod repository;
mod service;

pub use model::{
    BulkFailure, BulkResult, FollowUpItem, FollowUpReason, ItemPatch, ItemStatus, QueueFilter,
    QueueStatistics, SnoozeCommand,
};
pub use repository::QueueRepository;
pub use service::FollowUpQueue;
