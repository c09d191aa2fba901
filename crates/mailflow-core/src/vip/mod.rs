//! VIP sender management: tiered important-sender list with SLA overrides.

mod manager;
mod model;
mod repository;

pub use manager::VipManager;
pub use model::{SenderActivity, VipContact, VipSuggestion, VipTier};
pub use repository::VipRepository;
