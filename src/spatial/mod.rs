//! Spatial queries over the tile grid

pub mod pathfinding;

pub use pathfinding::{find_path, NavGrid, Path};
