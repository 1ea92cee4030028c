//! Built-in content set used by the CLI, benches, and tests

use std::sync::Arc;

use super::defs::{
    BuffDef, HaulDef, HaulSource, InteractionDef, InteractionKind, NeedDef, NeedGain,
    NeedThreshold, ObjectDef, ResourceDef, ResourceStoreDef, TerrainDef,
};
use super::registry::{ContentRegistry, ContentRegistryBuilder};
use crate::core::error::Result;
use crate::core::types::{BuffId, NeedId, ObjectDefId, ResourceId, Rgb, TerrainId};

pub const HUNGER: NeedId = NeedId(0);
pub const REST: NeedId = NeedId(1);
pub const FUN: NeedId = NeedId(2);
pub const PURPOSE: NeedId = NeedId(3);

pub const HUNGRY: BuffId = BuffId(0);
pub const STARVING: BuffId = BuffId(1);
pub const TIRED: BuffId = BuffId(2);
pub const EXHAUSTED: BuffId = BuffId(3);
pub const BORED: BuffId = BuffId(4);
pub const AIMLESS: BuffId = BuffId(5);
pub const WELL_FED: BuffId = BuffId(6);
pub const ENTERTAINED: BuffId = BuffId(7);
pub const PRODUCTIVE: BuffId = BuffId(8);
pub const RESTED: BuffId = BuffId(9);

pub const FOOD: ResourceId = ResourceId(0);
pub const WOOD: ResourceId = ResourceId(1);

pub const GRASS: TerrainId = TerrainId(0);
pub const SAND: TerrainId = TerrainId(1);
pub const ROAD: TerrainId = TerrainId(2);
pub const WATER: TerrainId = TerrainId(3);
pub const ROCK: TerrainId = TerrainId(4);
pub const TREE: TerrainId = TerrainId(5);
pub const FLOWERS: TerrainId = TerrainId(6);

pub const TAVERN: ObjectDefId = ObjectDefId(0);
pub const BED: ObjectDefId = ObjectDefId(1);
pub const PARK: ObjectDefId = ObjectDefId(2);
pub const FARM: ObjectDefId = ObjectDefId(3);
pub const GOLD_MINE: ObjectDefId = ObjectDefId(4);
pub const WAREHOUSE: ObjectDefId = ObjectDefId(5);
pub const HOME: ObjectDefId = ObjectDefId(6);

fn need(id: NeedId, name: &str, decay: f32, low: (f32, BuffId), critical: (f32, BuffId)) -> NeedDef {
    NeedDef {
        id,
        name: name.into(),
        decay_per_tick: decay,
        initial: 80.0,
        seek_threshold: 55.0,
        low: Some(NeedThreshold {
            below: low.0,
            buff: low.1,
        }),
        critical: Some(NeedThreshold {
            below: critical.0,
            buff: critical.1,
        }),
    }
}

fn buff(id: BuffId, name: &str, mood_offset: f32, duration: Option<u32>) -> BuffDef {
    BuffDef {
        id,
        name: name.into(),
        mood_offset,
        duration,
    }
}

fn terrain(id: TerrainId, name: &str, walkable: bool, cost: f32, color: Rgb) -> TerrainDef {
    TerrainDef {
        id,
        name: name.into(),
        walkable,
        move_cost: cost,
        color,
        resource: None,
    }
}

fn interaction(
    kind: InteractionKind,
    gains: &[(NeedId, f32)],
    duration: u32,
    grant_buff: Option<BuffId>,
) -> InteractionDef {
    InteractionDef {
        kind,
        satisfies: gains
            .iter()
            .map(|&(need, amount)| NeedGain { need, amount })
            .collect(),
        duration,
        grant_buff,
    }
}

/// Use-area ring around a `w` x `h` footprint, one tile per side midpoint
fn ring(w: i32, h: i32) -> Vec<(i32, i32)> {
    vec![(-1, 0), (w, h - 1), (0, h), (w - 1, -1)]
}

fn object(id: ObjectDefId, name: &str, footprint: (u32, u32), color: Rgb) -> ObjectDef {
    ObjectDef {
        id,
        name: name.into(),
        footprint,
        use_area: ring(footprint.0 as i32, footprint.1 as i32),
        interactions: Vec::new(),
        base_cost: 0,
        base_production: 0,
        producer_only: false,
        store: None,
        haul: None,
        housing: 0,
        initial_gold: 0,
        color,
    }
}

impl ContentRegistry {
    /// The default content set
    pub fn standard() -> Result<Arc<ContentRegistry>> {
        let mut tree = terrain(TREE, "tree", false, 1.0, Rgb(20, 90, 30));
        tree.resource = Some(WOOD);

        let mut tavern = object(TAVERN, "tavern", (2, 2), Rgb(170, 90, 40));
        tavern.base_cost = 8;
        tavern.base_production = 2;
        tavern.interactions = vec![
            interaction(
                InteractionKind::Use,
                &[(HUNGER, 45.0), (FUN, 10.0)],
                12,
                Some(WELL_FED),
            ),
            interaction(InteractionKind::Work, &[(PURPOSE, 30.0)], 30, Some(PRODUCTIVE)),
            interaction(InteractionKind::Haul, &[(PURPOSE, 15.0)], 6, None),
        ];
        tavern.store = Some(ResourceStoreDef {
            resource: FOOD,
            max: 40,
            initial: 20,
            consume_per_use: 1,
            restock_per_work: 2,
        });
        tavern.haul = Some(HaulDef {
            resource: FOOD,
            per_trip: 5,
            source: HaulSource::Object(FARM),
        });
        tavern.initial_gold = 40;

        let mut bed = object(BED, "bed", (1, 1), Rgb(120, 120, 200));
        bed.base_cost = 2;
        bed.interactions = vec![interaction(
            InteractionKind::Use,
            &[(REST, 60.0)],
            40,
            Some(RESTED),
        )];

        let mut park = object(PARK, "park", (2, 2), Rgb(90, 200, 90));
        park.base_cost = 1;
        park.interactions = vec![interaction(
            InteractionKind::Use,
            &[(FUN, 35.0)],
            15,
            Some(ENTERTAINED),
        )];

        let mut farm = object(FARM, "farm", (3, 2), Rgb(200, 180, 80));
        farm.base_cost = 4;
        farm.base_production = 3;
        farm.producer_only = true;
        farm.interactions = vec![interaction(
            InteractionKind::Work,
            &[(PURPOSE, 25.0), (HUNGER, 5.0)],
            40,
            Some(PRODUCTIVE),
        )];
        farm.store = Some(ResourceStoreDef {
            resource: FOOD,
            max: 60,
            initial: 10,
            consume_per_use: 0,
            restock_per_work: 6,
        });
        farm.initial_gold = 200;

        let mut mine = object(GOLD_MINE, "gold_mine", (2, 2), Rgb(230, 200, 40));
        mine.base_production = 6;
        mine.producer_only = true;
        mine.interactions = vec![interaction(
            InteractionKind::Work,
            &[(PURPOSE, 20.0)],
            50,
            None,
        )];

        let mut warehouse = object(WAREHOUSE, "warehouse", (2, 2), Rgb(140, 100, 70));
        warehouse.producer_only = true;
        warehouse.interactions = vec![interaction(
            InteractionKind::Haul,
            &[(PURPOSE, 15.0)],
            10,
            None,
        )];
        warehouse.store = Some(ResourceStoreDef {
            resource: WOOD,
            max: 100,
            initial: 0,
            consume_per_use: 0,
            restock_per_work: 0,
        });
        warehouse.haul = Some(HaulDef {
            resource: WOOD,
            per_trip: 5,
            source: HaulSource::Terrain(TREE),
        });

        let mut home = object(HOME, "home", (2, 2), Rgb(180, 60, 60));
        home.housing = 2;
        home.interactions = vec![interaction(
            InteractionKind::Use,
            &[(REST, 40.0)],
            30,
            None,
        )];

        ContentRegistryBuilder::new()
            .terrain(terrain(GRASS, "grass", true, 1.0, Rgb(70, 150, 60)))
            .terrain(terrain(SAND, "sand", true, 1.5, Rgb(220, 200, 140)))
            .terrain(terrain(ROAD, "road", true, 1.0, Rgb(120, 110, 100)))
            .terrain(terrain(WATER, "water", false, 1.0, Rgb(40, 90, 200)))
            .terrain(terrain(ROCK, "rock", false, 1.0, Rgb(100, 100, 100)))
            .terrain(tree)
            .terrain(terrain(FLOWERS, "flowers", true, 1.0, Rgb(220, 120, 180)))
            .resource(ResourceDef {
                id: FOOD,
                name: "food".into(),
            })
            .resource(ResourceDef {
                id: WOOD,
                name: "wood".into(),
            })
            .buff(buff(HUNGRY, "hungry", -10.0, None))
            .buff(buff(STARVING, "starving", -25.0, None))
            .buff(buff(TIRED, "tired", -8.0, None))
            .buff(buff(EXHAUSTED, "exhausted", -20.0, None))
            .buff(buff(BORED, "bored", -5.0, None))
            .buff(buff(AIMLESS, "aimless", -6.0, None))
            .buff(buff(WELL_FED, "well_fed", 10.0, Some(300)))
            .buff(buff(ENTERTAINED, "entertained", 8.0, Some(200)))
            .buff(buff(PRODUCTIVE, "productive", 5.0, Some(150)))
            .buff(buff(RESTED, "rested", 6.0, Some(200)))
            .need(need(HUNGER, "hunger", 0.08, (30.0, HUNGRY), (10.0, STARVING)))
            .need(need(REST, "rest", 0.05, (30.0, TIRED), (10.0, EXHAUSTED)))
            .need(need(FUN, "fun", 0.04, (25.0, BORED), (5.0, BORED)))
            .need(need(PURPOSE, "purpose", 0.06, (25.0, AIMLESS), (5.0, AIMLESS)))
            .object(tavern)
            .object(bed)
            .object(park)
            .object(farm)
            .object(mine)
            .object(warehouse)
            .object(home)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_content_builds() {
        let registry = ContentRegistry::standard().unwrap();
        assert_eq!(registry.needs().count(), 4);
        assert!(registry.object(GOLD_MINE).unwrap().is_gold_source());
        assert!(!registry.object(TAVERN).unwrap().is_gold_source());
        assert_eq!(registry.default_terrain(), GRASS);
    }

    #[test]
    fn test_every_need_has_a_satisfier() {
        let registry = ContentRegistry::standard().unwrap();
        for need in registry.needs() {
            assert!(
                !registry.satisfiers_of(need.id).is_empty(),
                "need '{}' has no satisfier",
                need.name
            );
        }
    }

    #[test]
    fn test_farm_is_not_a_hunger_use_satisfier() {
        let registry = ContentRegistry::standard().unwrap();
        // Farm work grants a little hunger relief, but it is Work, not Use
        let farm_entries: Vec<_> = registry
            .satisfiers_of(HUNGER)
            .iter()
            .filter(|(def, _)| *def == FARM)
            .collect();
        assert_eq!(farm_entries.len(), 1);
        let (_, index) = farm_entries[0];
        let kind = registry.object(FARM).unwrap().interactions[*index].kind;
        assert_eq!(kind, InteractionKind::Work);
    }
}
