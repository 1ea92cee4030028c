//! Immutable content definitions (needs, buffs, objects, terrain, resources)
//!
//! Definitions are registered once through `ContentRegistryBuilder`, validated,
//! and frozen. The simulation only ever reads them by id.

pub mod defs;
pub mod registry;
pub mod standard;

pub use defs::{
    BuffDef, HaulDef, HaulSource, InteractionDef, InteractionKind, NeedDef, NeedGain,
    NeedThreshold, ObjectDef, ResourceDef, ResourceStoreDef, TerrainDef,
};
pub use registry::{ContentRegistry, ContentRegistryBuilder};
