//! Shared fixtures: a tiny content set with one slow-decaying need

#![allow(dead_code)]

use std::sync::Arc;

use colony_sim::content::{
    ContentRegistry, ContentRegistryBuilder, InteractionDef, InteractionKind, NeedDef, NeedGain,
    ObjectDef, TerrainDef,
};
use colony_sim::core::types::{NeedId, ObjectDefId, Rgb, TerrainId};
use colony_sim::core::SimulationConfig;
use colony_sim::ecs::world::World;
use colony_sim::simulation::{check_invariants, run_simulation_tick, SimulationEvent};

pub const COMFORT: NeedId = NeedId(0);
pub const GRASS: TerrainId = TerrainId(0);
pub const WATER: TerrainId = TerrainId(1);
pub const WELL: ObjectDefId = ObjectDefId(0);
pub const SHOP: ObjectDefId = ObjectDefId(1);

fn terrain(id: TerrainId, name: &str, walkable: bool) -> TerrainDef {
    TerrainDef {
        id,
        name: name.into(),
        walkable,
        move_cost: 1.0,
        color: Rgb(0, 0, 0),
        resource: None,
    }
}

fn object(id: ObjectDefId, name: &str, use_area: Vec<(i32, i32)>, kind: InteractionKind, duration: u32) -> ObjectDef {
    ObjectDef {
        id,
        name: name.into(),
        footprint: (1, 1),
        use_area,
        interactions: vec![InteractionDef {
            kind,
            satisfies: vec![NeedGain {
                need: COMFORT,
                amount: 60.0,
            }],
            duration,
            grant_buff: None,
        }],
        base_cost: 0,
        base_production: 0,
        producer_only: false,
        store: None,
        haul: None,
        housing: 0,
        initial_gold: 0,
        color: Rgb(255, 255, 255),
    }
}

/// One need, a free well with the given use area, and a paying shop
pub fn registry(well_use_area: Vec<(i32, i32)>, well_duration: u32) -> Arc<ContentRegistry> {
    let mut shop = object(SHOP, "shop", vec![(-1, 0)], InteractionKind::Work, 10);
    shop.base_cost = 10;
    shop.base_production = 2;
    shop.initial_gold = 100;

    ContentRegistryBuilder::new()
        .terrain(terrain(GRASS, "grass", true))
        .terrain(terrain(WATER, "water", false))
        .need(NeedDef {
            id: COMFORT,
            name: "comfort".into(),
            decay_per_tick: 0.0001,
            initial: 80.0,
            seek_threshold: 55.0,
            low: None,
            critical: None,
        })
        .object(object(WELL, "well", well_use_area, InteractionKind::Use, well_duration))
        .object(shop)
        .build()
        .unwrap()
}

pub fn world(registry: Arc<ContentRegistry>, width: u32, height: u32) -> World {
    world_with(SimulationConfig::default(), registry, width, height)
}

pub fn world_with(config: SimulationConfig, registry: Arc<ContentRegistry>, width: u32, height: u32) -> World {
    World::new(config, registry, width, height, 42).unwrap()
}

/// Tick `n` times, checking invariants after every tick
pub fn run_checked(world: &mut World, n: u64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(run_simulation_tick(world));
        let violations = check_invariants(world);
        assert!(violations.is_empty(), "tick {}: {:?}", world.current_tick, violations);
    }
    events
}
