//! Definition schema types

use serde::{Deserialize, Serialize};

use crate::core::types::{BuffId, NeedId, ObjectDefId, ResourceId, Rgb, TerrainId};

/// A decaying drive (hunger, rest, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedDef {
    pub id: NeedId,
    pub name: String,
    /// Points lost per tick (values live in 0..=100)
    pub decay_per_tick: f32,
    /// Value a freshly created pawn starts with
    pub initial: f32,
    /// Below this value the decision engine starts looking for a satisfier
    pub seek_threshold: f32,
    /// Debuff applied while the value stays under `low.below`
    pub low: Option<NeedThreshold>,
    /// Debuff applied while the value stays under `critical.below`
    pub critical: Option<NeedThreshold>,
}

/// Threshold that ties a buff to a need value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedThreshold {
    pub below: f32,
    pub buff: BuffId,
}

/// A mood modifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffDef {
    pub id: BuffId,
    pub name: String,
    pub mood_offset: f32,
    /// Lifetime in ticks when granted by an action; need-tied buffs ignore it
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDef {
    pub id: TerrainId,
    pub name: String,
    pub walkable: bool,
    /// Cost of entering a tile of this terrain; must be >= 1.0
    pub move_cost: f32,
    pub color: Rgb,
    /// Resource that can be hauled from tiles of this terrain
    pub resource: Option<ResourceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// Consume a service, paying gold
    Use,
    /// Labor, earning gold and restocking the building
    Work,
    /// Carry resources from a source into this building
    Haul,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedGain {
    pub need: NeedId,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDef {
    pub kind: InteractionKind,
    pub satisfies: Vec<NeedGain>,
    /// Ticks spent interacting before completion applies
    pub duration: u32,
    pub grant_buff: Option<BuffId>,
}

impl InteractionDef {
    pub fn gain_for(&self, need: NeedId) -> f32 {
        self.satisfies
            .iter()
            .filter(|g| g.need == need)
            .map(|g| g.amount)
            .sum()
    }
}

/// Per-instance resource store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStoreDef {
    pub resource: ResourceId,
    pub max: u32,
    pub initial: u32,
    /// Units consumed by one completed Use (0 = store not consumed by use)
    pub consume_per_use: u32,
    /// Units added by one completed Work, capped at `max`
    pub restock_per_work: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaulSource {
    /// Any live instance of this definition with stock of the resource
    Object(ObjectDefId),
    /// Any tile whose base or overlay is this terrain
    Terrain(TerrainId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulDef {
    pub resource: ResourceId,
    pub per_trip: u32,
    pub source: HaulSource,
}

/// A placeable building or object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub id: ObjectDefId,
    pub name: String,
    /// (width, height) in tiles; every covered tile becomes impassable
    pub footprint: (u32, u32),
    /// Tile offsets relative to the anchor from which pawns interact
    pub use_area: Vec<(i32, i32)>,
    pub interactions: Vec<InteractionDef>,
    pub base_cost: u64,
    pub base_production: u64,
    /// Never sells to consumers; only Work/Haul interactions are offered
    pub producer_only: bool,
    pub store: Option<ResourceStoreDef>,
    pub haul: Option<HaulDef>,
    /// Resident slots for population growth
    pub housing: u32,
    pub initial_gold: u64,
    pub color: Rgb,
}

impl ObjectDef {
    /// Gold sources mint work payouts instead of drawing from their store
    pub fn is_gold_source(&self) -> bool {
        self.base_cost == 0 && self.has_interaction(InteractionKind::Work)
    }

    pub fn has_interaction(&self, kind: InteractionKind) -> bool {
        self.interactions.iter().any(|i| i.kind == kind)
    }

    /// Whether interaction `index` is actually offered by this definition
    pub fn offers(&self, index: usize) -> bool {
        match self.interactions.get(index) {
            Some(i) if i.kind == InteractionKind::Use => !self.producer_only,
            Some(i) if i.kind == InteractionKind::Haul => self.haul.is_some(),
            Some(_) => true,
            None => false,
        }
    }

    /// Offsets covered by the footprint, relative to the anchor
    pub fn footprint_offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (w, h) = self.footprint;
        (0..h as i32).flat_map(move |dy| (0..w as i32).map(move |dx| (dx, dy)))
    }
}
