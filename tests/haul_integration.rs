//! Hauling: cargo moves between stores and terrain, never gold

mod common;

use std::sync::Arc;

use colony_sim::content::{
    ContentRegistry, ContentRegistryBuilder, HaulDef, HaulSource, InteractionDef, InteractionKind,
    NeedDef, NeedGain, ObjectDef, ResourceDef, ResourceStoreDef, TerrainDef,
};
use colony_sim::core::types::{EntityId, NeedId, ObjectDefId, ResourceId, Rgb, TerrainId, TilePos};
use colony_sim::core::SimulationConfig;
use colony_sim::ecs::world::World;
use colony_sim::entity::Action;
use colony_sim::simulation::{run_simulation_tick, SimulationEvent};
use colony_sim::world::TileLayer;

use common::{run_checked, world_with};

const COMFORT: NeedId = NeedId(0);
const GRASS: TerrainId = TerrainId(0);
const TREE: TerrainId = TerrainId(1);
const FOOD: ResourceId = ResourceId(0);
const WOOD: ResourceId = ResourceId(1);
const SILO: ObjectDefId = ObjectDefId(0);
const PANTRY: ObjectDefId = ObjectDefId(1);
const DEPOT: ObjectDefId = ObjectDefId(2);

const PANTRY_MAX: u32 = 20;

fn store(resource: ResourceId, max: u32, initial: u32) -> Option<ResourceStoreDef> {
    Some(ResourceStoreDef {
        resource,
        max,
        initial,
        consume_per_use: 0,
        restock_per_work: 0,
    })
}

fn haul_object(id: ObjectDefId, name: &str, haul: HaulDef, store_def: Option<ResourceStoreDef>) -> ObjectDef {
    ObjectDef {
        id,
        name: name.into(),
        footprint: (1, 1),
        use_area: vec![(-1, 0)],
        interactions: vec![InteractionDef {
            kind: InteractionKind::Haul,
            satisfies: vec![NeedGain {
                need: COMFORT,
                amount: 10.0,
            }],
            duration: 4,
            grant_buff: None,
        }],
        base_cost: 0,
        base_production: 0,
        producer_only: true,
        store: store_def,
        haul: Some(haul),
        housing: 0,
        initial_gold: 0,
        color: Rgb(0, 0, 0),
    }
}

/// A food silo feeding a pantry, and a wood depot fed from trees
fn registry(pantry_initial: u32) -> Arc<ContentRegistry> {
    let silo = ObjectDef {
        id: SILO,
        name: "silo".into(),
        footprint: (1, 1),
        use_area: vec![(1, 0)],
        interactions: Vec::new(),
        base_cost: 0,
        base_production: 0,
        producer_only: true,
        store: store(FOOD, 60, 12),
        haul: None,
        housing: 0,
        initial_gold: 0,
        color: Rgb(0, 0, 0),
    };
    let pantry = haul_object(
        PANTRY,
        "pantry",
        HaulDef {
            resource: FOOD,
            per_trip: 5,
            source: HaulSource::Object(SILO),
        },
        store(FOOD, PANTRY_MAX, pantry_initial),
    );
    let depot = haul_object(
        DEPOT,
        "depot",
        HaulDef {
            resource: WOOD,
            per_trip: 5,
            source: HaulSource::Terrain(TREE),
        },
        store(WOOD, 100, 0),
    );

    ContentRegistryBuilder::new()
        .resource(ResourceDef {
            id: FOOD,
            name: "food".into(),
        })
        .resource(ResourceDef {
            id: WOOD,
            name: "wood".into(),
        })
        .terrain(TerrainDef {
            id: GRASS,
            name: "grass".into(),
            walkable: true,
            move_cost: 1.0,
            color: Rgb(0, 0, 0),
            resource: None,
        })
        .terrain(TerrainDef {
            id: TREE,
            name: "tree".into(),
            walkable: false,
            move_cost: 1.0,
            color: Rgb(0, 0, 0),
            resource: Some(WOOD),
        })
        .need(NeedDef {
            id: COMFORT,
            name: "comfort".into(),
            decay_per_tick: 0.0001,
            initial: 80.0,
            seek_threshold: 55.0,
            low: None,
            critical: None,
        })
        .object(silo)
        .object(pantry)
        .object(depot)
        .build()
        .unwrap()
}

fn stock(world: &World, building: EntityId) -> u32 {
    let b = world.buildings.index_of(building).unwrap();
    world.buildings.stores[b].map_or(0, |s| s.amount)
}

fn is_haul_done(event: &SimulationEvent) -> bool {
    matches!(
        event,
        SimulationEvent::InteractionCompleted {
            kind: InteractionKind::Haul,
            gold: 0,
            ..
        }
    )
}

/// Silo at (1,1), pantry at (8,1), one worker in between
fn pantry_world(pantry_initial: u32) -> (World, EntityId, EntityId) {
    let mut world = world_with(SimulationConfig::default(), registry(pantry_initial), 12, 3);
    let silo = world.spawn_building(SILO, TilePos::new(1, 1)).unwrap();
    let pantry = world.spawn_building(PANTRY, TilePos::new(8, 1)).unwrap();
    world.spawn_pawn("porter", TilePos::new(4, 1)).unwrap();
    world.pawns.needs[0].set(COMFORT, 0.0);
    (world, silo, pantry)
}

#[test]
fn test_wood_hauled_from_trees() {
    let mut world = world_with(SimulationConfig::default(), registry(0), 12, 5);
    world
        .paint_terrain(TilePos::new(1, 2), TileLayer::Overlay, Some(TREE))
        .unwrap();
    let depot = world.spawn_building(DEPOT, TilePos::new(9, 2)).unwrap();
    world.spawn_pawn("logger", TilePos::new(5, 2)).unwrap();
    world.pawns.needs[0].set(COMFORT, 0.0);
    let gold = world.pawns.gold[0];
    let total = world.total_gold();

    let events = run_checked(&mut world, 400);

    let trips = events.iter().filter(|e| is_haul_done(e)).count() as u32;
    assert!(trips >= 3, "only {trips} trips");
    assert_eq!(stock(&world, depot), 5 * trips);
    assert_eq!(world.pawns.gold[0], gold);
    assert_eq!(world.total_gold(), total);
}

#[test]
fn test_food_hauled_per_trip_until_source_runs_dry() {
    let (mut world, silo, pantry) = pantry_world(0);
    let gold = world.pawns.gold[0];

    let mut delivered = Vec::new();
    for _ in 0..300 {
        let events = run_checked(&mut world, 1);
        if events.iter().any(is_haul_done) {
            delivered.push(stock(&world, pantry));
        }
    }

    // Two full trips, then the last two units
    assert_eq!(delivered, vec![5, 10, 12]);
    assert_eq!(stock(&world, silo), 0);
    assert_eq!(world.pawns.gold[0], gold);
    assert!(world.pawns.inventories[0].is_empty());
}

#[test]
fn test_full_destination_is_never_chosen() {
    let (mut world, silo, pantry) = pantry_world(PANTRY_MAX);
    let events = run_checked(&mut world, 100);
    assert!(!events.iter().any(is_haul_done));
    assert_eq!(stock(&world, silo), 12);
    assert_eq!(stock(&world, pantry), PANTRY_MAX);
}

#[test]
fn test_destination_filling_mid_trip_aborts_haul() {
    let (mut world, silo, pantry) = pantry_world(0);
    let mut loaded = false;
    for _ in 0..100 {
        run_simulation_tick(&mut world);
        if !world.pawns.inventories[0].is_empty() {
            loaded = true;
            break;
        }
    }
    assert!(loaded);

    let b = world.buildings.index_of(pantry).unwrap();
    if let Some(store) = world.buildings.stores[b].as_mut() {
        store.amount = store.max;
    }
    // The pawn notices on arrival and drops its cargo
    let events = run_checked(&mut world, 60);

    assert!(!events.iter().any(is_haul_done));
    assert!(world.pawns.inventories[0].is_empty());
    assert!(!matches!(world.pawns.actions[0].current(), Action::Haul { .. }));
    assert_eq!(stock(&world, pantry), PANTRY_MAX);
    // The dropped cargo is gone
    assert_eq!(stock(&world, silo), 7);
}

#[test]
fn test_empty_source_aborts_pickup() {
    let (mut world, silo, pantry) = pantry_world(0);
    run_checked(&mut world, 1);
    assert!(matches!(
        world.pawns.actions[0].current(),
        Action::MoveTo { target, .. } if *target == Some(silo)
    ));

    let s = world.buildings.index_of(silo).unwrap();
    if let Some(store) = world.buildings.stores[s].as_mut() {
        store.amount = 0;
    }
    let events = run_checked(&mut world, 100);

    assert!(!events.iter().any(is_haul_done));
    assert_eq!(stock(&world, pantry), 0);
    assert!(world.pawns.inventories[0].is_empty());
}
