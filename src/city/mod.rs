//! City layer - building instances, stores, gold economy, and levels

pub mod building;
pub mod economy;
pub mod level;
pub mod stockpile;

pub use building::{BuildingArchetype, ATTACHMENT_MAX};
pub use economy::{
    buy_in, check_use, check_work, settle_use, settle_work, use_cost, work_payout,
    EconomyFailure, Treasury, UseReceipt, WorkReceipt,
};
pub use level::{FixedLevelPolicy, LevelPolicy, SavedLevelPolicy, ThroughputLevelPolicy};
pub use stockpile::ResourceStore;
