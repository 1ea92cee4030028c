//! Entity storage and the per-instance world

pub mod world;

pub use world::World;
