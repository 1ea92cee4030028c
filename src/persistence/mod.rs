//! Save/restore of complete world state

pub mod save;

pub use save::{BuildingRecord, PawnRecord, SaveState, SAVE_VERSION};
