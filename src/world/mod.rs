//! Grid world: tile storage, the occupancy/lock arena, and path-failure memory

pub mod occupancy;
pub mod tiles;
pub mod unreachable;

pub use occupancy::{LockResult, Occupancy};
pub use tiles::{Tile, TileLayer, TileMap};
pub use unreachable::UnreachableCache;
