//! Read-only views of simulation state for presentation
//!
//! This module never modifies simulation state. Snapshots are copy-out, so
//! a consumer may hold one while the world keeps ticking.

pub mod colors;
pub mod snapshot;

pub use snapshot::{collect_snapshot, BuildingView, PawnView, RenderSnapshot};
