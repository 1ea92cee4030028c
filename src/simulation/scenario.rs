//! Demo world used by the CLI and the benches

use std::sync::Arc;

use crate::content::standard::{
    BED, FARM, FLOWERS, GOLD_MINE, HOME, PARK, ROAD, ROCK, SAND, TAVERN, TREE, WAREHOUSE, WATER,
};
use crate::content::ContentRegistry;
use crate::core::error::Result;
use crate::core::types::{ObjectDefId, TerrainId, TilePos};
use crate::core::SimulationConfig;
use crate::ecs::world::World;
use crate::world::TileLayer;

pub const DEMO_WIDTH: u32 = 48;
pub const DEMO_HEIGHT: u32 = 32;

/// Build the demo village: varied terrain, one of each building, a few pawns
pub fn demo_world(config: SimulationConfig, registry: Arc<ContentRegistry>, seed: u64) -> Result<World> {
    let mut world = World::new(config, registry, DEMO_WIDTH, DEMO_HEIGHT, seed)?;

    paint_rect(&mut world, TileLayer::Base, WATER, (34, 2), (42, 8))?;
    paint_rect(&mut world, TileLayer::Base, SAND, (33, 9), (43, 10))?;
    paint_rect(&mut world, TileLayer::Overlay, ROAD, (0, 15), (47, 15))?;
    paint_rect(&mut world, TileLayer::Overlay, ROAD, (20, 0), (20, 31))?;
    paint_rect(&mut world, TileLayer::Overlay, TREE, (2, 24), (9, 29))?;
    paint_rect(&mut world, TileLayer::Overlay, ROCK, (40, 24), (44, 27))?;
    paint_rect(&mut world, TileLayer::Overlay, FLOWERS, (24, 20), (30, 22))?;

    let buildings: [(ObjectDefId, (i32, i32)); 11] = [
        (TAVERN, (16, 11)),
        (BED, (5, 4)),
        (BED, (8, 4)),
        (BED, (11, 4)),
        (PARK, (26, 17)),
        (FARM, (24, 4)),
        (GOLD_MINE, (36, 20)),
        (WAREHOUSE, (12, 22)),
        (HOME, (4, 10)),
        (HOME, (28, 10)),
        (TAVERN, (40, 13)),
    ];
    for (def, (x, y)) in buildings {
        world.spawn_building(def, TilePos::new(x, y))?;
    }

    for (i, (x, y)) in [(2, 2), (14, 8), (22, 18), (30, 14), (18, 26), (45, 30)]
        .into_iter()
        .enumerate()
    {
        world.spawn_pawn(format!("Settler {}", i + 1), TilePos::new(x, y))?;
    }

    tracing::info!(
        seed,
        pawns = world.pawns.live_count(),
        buildings = world.buildings.live_count(),
        "Demo world ready"
    );
    Ok(world)
}

fn paint_rect(
    world: &mut World,
    layer: TileLayer,
    terrain: TerrainId,
    from: (i32, i32),
    to: (i32, i32),
) -> Result<()> {
    for y in from.1..=to.1 {
        for x in from.0..=to.0 {
            world.paint_terrain(TilePos::new(x, y), layer, Some(terrain))?;
        }
    }
    Ok(())
}
