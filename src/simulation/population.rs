//! Population growth system
//!
//! Homes spawn residents while the colony is under its cap. The cap grows
//! with housing and with how varied the painted map is.

use std::sync::Arc;

use crate::content::ObjectDef;
use crate::core::types::{EntityId, TilePos};
use crate::ecs::world::World;
use crate::simulation::tick::SimulationEvent;

/// Live pawns the world can support right now
pub fn population_cap(world: &World) -> usize {
    let registry = world.registry();
    let housing: usize = world
        .buildings
        .iter_living()
        .filter_map(|b| registry.object(world.buildings.def_ids[b]))
        .map(|def| def.housing as usize)
        .sum();
    let divisor = world.config.variety_divisor.max(1) as usize;
    housing + world.tiles.distinct_terrain_count() / divisor
}

/// Spawn residents at homes whose spawn interval has elapsed
///
/// Homes are visited in ascending id order; each spawns at most one pawn per
/// call. Returns the ids of new pawns.
pub fn try_population_growth(world: &mut World, events: &mut Vec<SimulationEvent>) -> Vec<EntityId> {
    let mut spawned = Vec::new();
    let cap = population_cap(world);
    let registry = Arc::clone(world.registry());
    let tick = world.current_tick;
    let interval = world.config.spawn_interval;

    for b in world.buildings.iter_living().collect::<Vec<_>>() {
        if world.pawns.live_count() >= cap {
            break;
        }
        let Some(def) = registry.object(world.buildings.def_ids[b]) else {
            continue;
        };
        if def.housing == 0 || tick < world.buildings.last_spawn[b] + interval {
            continue;
        }
        let home = world.buildings.ids[b];
        if world.pawns.residents_of(home) >= def.housing as usize {
            continue;
        }

        let Some(pos) = spawn_tile(world, b, def) else {
            continue;
        };
        let name = format!("Resident {}", world.next_entity_id());
        let Ok(pawn) = world.spawn_pawn(name, pos) else {
            continue;
        };
        if let Some(p) = world.pawns.index_of(pawn) {
            world.pawns.homes[p] = Some(home);
        }
        world.buildings.last_spawn[b] = tick;
        tracing::info!(pawn = %pawn, home = %home, "Resident moved in");
        events.push(SimulationEvent::PawnSpawned { pawn, home, tick });
        spawned.push(pawn);
    }
    spawned
}

/// First use-area tile a new resident can stand on
fn spawn_tile(world: &World, b: usize, def: &ObjectDef) -> Option<TilePos> {
    world
        .buildings
        .use_tiles(b, def)
        .into_iter()
        .find(|&pos| world.check_standable(pos).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::HOME;
    use crate::content::ContentRegistry;
    use crate::core::SimulationConfig;

    fn world(spawn_interval: u64) -> World {
        let config = SimulationConfig {
            spawn_interval,
            ..SimulationConfig::default()
        };
        World::new(config, ContentRegistry::standard().unwrap(), 10, 10, 3).unwrap()
    }

    #[test]
    fn test_cap_counts_housing_and_variety() {
        let mut world = world(10);
        assert_eq!(population_cap(&world), 0);
        world.spawn_building(HOME, TilePos::new(4, 4)).unwrap();
        // One terrain kind over a divisor of 3 adds nothing
        assert_eq!(population_cap(&world), 2);
    }

    #[test]
    fn test_home_spawns_after_interval() {
        let mut world = world(10);
        let home = world.spawn_building(HOME, TilePos::new(4, 4)).unwrap();
        let mut events = Vec::new();
        assert!(try_population_growth(&mut world, &mut events).is_empty());

        world.current_tick = 10;
        let spawned = try_population_growth(&mut world, &mut events);
        assert_eq!(spawned.len(), 1);
        let p = world.pawns.index_of(spawned[0]).unwrap();
        assert_eq!(world.pawns.homes[p], Some(home));
        assert_eq!(world.pawns.positions[p], TilePos::new(3, 4));
        assert!(matches!(events[0], SimulationEvent::PawnSpawned { .. }));
        assert_eq!(world.total_gold(), world.treasury.expected_total());
    }

    #[test]
    fn test_growth_stops_at_housing() {
        let mut world = world(1);
        world.spawn_building(HOME, TilePos::new(4, 4)).unwrap();
        let mut events = Vec::new();
        for tick in 1..20 {
            world.current_tick = tick;
            try_population_growth(&mut world, &mut events);
        }
        assert_eq!(world.pawns.live_count(), 2);
    }
}
