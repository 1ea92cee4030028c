//! Point-in-time snapshot of everything a renderer draws

use serde::Serialize;

use crate::core::types::{EntityId, Rgb, Tick, TilePos};
use crate::ecs::world::World;
use crate::render::colors::{mood_color, stock_tint, BACKGROUND};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PawnView {
    pub id: EntityId,
    pub name: String,
    pub position: TilePos,
    pub mood: f32,
    pub color: Rgb,
    pub action: &'static str,
    pub gold: u64,
    /// Resource name and amount when hauling
    pub carrying: Option<(String, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingView {
    pub id: EntityId,
    pub kind: String,
    pub anchor: TilePos,
    pub footprint: (u32, u32),
    pub level: u32,
    pub gold: u64,
    pub color: Rgb,
    /// Resource name, amount, and max for stocked buildings
    pub stock: Option<(String, u32, u32)>,
    pub in_use_by: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub tick: Tick,
    pub width: u32,
    pub height: u32,
    /// Row-major display colors
    pub tiles: Vec<Rgb>,
    pub pawns: Vec<PawnView>,
    pub buildings: Vec<BuildingView>,
    pub tax_pool: u64,
}

/// Fill `snapshot` from the world, reusing its buffers
///
/// Call once per frame, passing the same snapshot to avoid allocations.
pub fn collect_snapshot(world: &World, snapshot: &mut RenderSnapshot) {
    let registry = world.registry();
    snapshot.tick = world.current_tick;
    snapshot.width = world.tiles.width();
    snapshot.height = world.tiles.height();
    snapshot.tax_pool = world.treasury.tax_pool;

    snapshot.tiles.clear();
    snapshot.tiles.extend(
        world
            .tiles
            .iter()
            .map(|(pos, _)| world.tiles.display_color(pos, registry).unwrap_or(BACKGROUND)),
    );

    let resource_name = |id| {
        registry
            .resource(id)
            .map_or_else(|| "unknown".to_string(), |r| r.name.clone())
    };

    snapshot.pawns.clear();
    for p in world.pawns.iter_living() {
        let inventory = &world.pawns.inventories[p];
        snapshot.pawns.push(PawnView {
            id: world.pawns.ids[p],
            name: world.pawns.names[p].clone(),
            position: world.pawns.positions[p],
            mood: world.pawns.moods[p],
            color: mood_color(world.pawns.moods[p]),
            action: world.pawns.actions[p].current().label(),
            gold: world.pawns.gold[p],
            carrying: inventory
                .resource
                .filter(|_| inventory.amount > 0)
                .map(|r| (resource_name(r), inventory.amount)),
        });
    }

    snapshot.buildings.clear();
    for b in world.buildings.iter_living() {
        let Some(def) = registry.object(world.buildings.def_ids[b]) else {
            continue;
        };
        let store = world.buildings.stores[b];
        let fill = store.map(|s| if s.max == 0 { 0.0 } else { s.amount as f32 / s.max as f32 });
        let id = world.buildings.ids[b];
        snapshot.buildings.push(BuildingView {
            id,
            kind: def.name.clone(),
            anchor: world.buildings.anchors[b],
            footprint: def.footprint,
            level: world.buildings.levels[b],
            gold: world.buildings.gold[b],
            color: stock_tint(def.color, fill),
            stock: store.map(|s| (resource_name(s.resource), s.amount, s.max)),
            in_use_by: world.occupancy.holder(id),
        });
    }
}

impl RenderSnapshot {
    pub fn capture(world: &World) -> Self {
        let mut snapshot = Self::default();
        collect_snapshot(world, &mut snapshot);
        snapshot
    }

    /// Mean mood over live pawns; 0 when nobody lives here
    pub fn average_mood(&self) -> f32 {
        if self.pawns.is_empty() {
            return 0.0;
        }
        self.pawns.iter().map(|p| p.mood).sum::<f32>() / self.pawns.len() as f32
    }
}
