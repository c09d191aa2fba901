//! Response-time obligations: deadline computation and live SLA status.

mod model;
mod tracker;

pub use model::{SlaPolicy, SlaStatus, WorkingHours};
pub use tracker::SlaTracker;
