//! Property tests: arbitrary edit sequences never break the world's invariants

use proptest::prelude::*;

use colony_sim::city::economy::{buy_in, level_scaled};
use colony_sim::command::{Command, CommandExecutor};
use colony_sim::content::standard::{BED, HOME, PARK, ROCK, TAVERN, TREE, WATER};
use colony_sim::content::ContentRegistry;
use colony_sim::core::types::{ObjectDefId, TerrainId, TilePos};
use colony_sim::core::SimulationConfig;
use colony_sim::ecs::world::World;
use colony_sim::persistence::SaveState;
use colony_sim::simulation::check_invariants;
use colony_sim::world::TileLayer;

const SIZE: i32 = 12;

fn pos() -> impl Strategy<Value = TilePos> {
    // One tile of slack on each side so out-of-bounds edits are exercised too
    (-1..=SIZE, -1..=SIZE).prop_map(|(x, y)| TilePos::new(x, y))
}

fn building() -> impl Strategy<Value = ObjectDefId> {
    prop_oneof![Just(BED), Just(PARK), Just(TAVERN), Just(HOME)]
}

fn overlay() -> impl Strategy<Value = Option<TerrainId>> {
    prop_oneof![Just(None), Just(Some(WATER)), Just(Some(ROCK)), Just(Some(TREE))]
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        pos().prop_map(|pos| Command::PlacePawn {
            name: "prop".into(),
            pos
        }),
        (building(), pos()).prop_map(|(def, anchor)| Command::PlaceBuilding { def, anchor }),
        (pos(), overlay()).prop_map(|(pos, terrain)| Command::PaintTerrain {
            pos,
            layer: TileLayer::Overlay,
            terrain
        }),
        pos().prop_map(|pos| Command::DeleteAt { pos }),
        (1u64..40).prop_map(|ticks| Command::Advance { ticks }),
    ]
}

fn empty_world(seed: u64) -> World {
    World::new(
        SimulationConfig::default(),
        ContentRegistry::standard().unwrap(),
        SIZE as u32,
        SIZE as u32,
        seed,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_edits_preserve_invariants(
        seed in 0u64..1000,
        commands in prop::collection::vec(command(), 1..40),
    ) {
        let mut world = empty_world(seed);
        for command in commands {
            let before = SaveState::export(&world);
            let result = CommandExecutor::execute(&mut world, command.clone());
            if result.is_err() {
                prop_assert_eq!(&before, &SaveState::export(&world), "{:?} left a trace", command);
            }
            let violations = check_invariants(&world);
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", command, violations);
        }
    }

    #[test]
    fn prop_buy_in_is_half_above_threshold(payout in 0u64..1_000_000) {
        let required = buy_in(payout);
        if payout <= 10 {
            prop_assert_eq!(required, 0);
        } else {
            prop_assert_eq!(required, payout / 2);
        }
    }

    #[test]
    fn prop_level_scaling_never_shrinks(base in 0u64..10_000, level in 0u32..10) {
        prop_assert!(level_scaled(base, level + 1) >= level_scaled(base, level));
        prop_assert!(level_scaled(base, level) >= base);
    }
}
