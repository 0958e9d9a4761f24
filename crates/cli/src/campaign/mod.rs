//! Campaign orchestration module.

mod driver;
mod endpoints;
mod stats;

pub use driver::{Campaign, CampaignConfig};
pub use stats::CampaignStats;
