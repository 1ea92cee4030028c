//! Need decay, need-tied debuffs, timed buff countdown, and mood

use crate::content::ContentRegistry;
use crate::ecs::world::World;
use crate::entity::buffs::BuffSet;
use crate::entity::needs::Needs;

/// Decay every need, re-evaluate need thresholds, and count down timed buffs
pub fn update_needs(world: &mut World) {
    let registry = std::sync::Arc::clone(world.registry());
    for i in world.pawns.iter_living().collect::<Vec<_>>() {
        world.pawns.needs[i].decay(&registry);
        refresh_need_buffs(&registry, &world.pawns.needs[i], &mut world.pawns.buffs[i]);
        world.pawns.buffs[i].tick();
    }
}

/// Make need-tied buffs match current need values exactly
pub fn refresh_need_buffs(registry: &ContentRegistry, needs: &Needs, buffs: &mut BuffSet) {
    for def in registry.needs() {
        let Some(value) = needs.get(def.id) else {
            continue;
        };
        let thresholds: Vec<_> = [def.low, def.critical].into_iter().flatten().collect();
        for (i, threshold) in thresholds.iter().enumerate() {
            // A buff shared by both thresholds is evaluated once
            if thresholds[..i].iter().any(|t| t.buff == threshold.buff) {
                continue;
            }
            let active = thresholds
                .iter()
                .any(|t| t.buff == threshold.buff && value < t.below);
            let offset = registry
                .buff(threshold.buff)
                .map_or(0.0, |b| b.mood_offset);
            buffs.set_need_buff(def.id, threshold.buff, offset, active);
        }
    }
}

/// Recompute every live pawn's mood from its active buffs
///
/// Need-tied buffs are refreshed first: interactions raise needs after
/// `update_needs` ran, and a debuff must not outlive its threshold.
pub fn recompute_moods(world: &mut World) {
    let registry = std::sync::Arc::clone(world.registry());
    for i in world.pawns.iter_living().collect::<Vec<_>>() {
        refresh_need_buffs(&registry, &world.pawns.needs[i], &mut world.pawns.buffs[i]);
        world.pawns.moods[i] = world.pawns.buffs[i].mood();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::standard::{HUNGER, HUNGRY, STARVING};
    use crate::core::types::TilePos;
    use crate::core::SimulationConfig;

    fn world_with_pawn() -> World {
        let mut world = World::new(
            SimulationConfig::default(),
            ContentRegistry::standard().unwrap(),
            4,
            4,
            1,
        )
        .unwrap();
        world.spawn_pawn("a", TilePos::new(0, 0)).unwrap();
        world
    }

    #[test]
    fn test_need_buffs_follow_thresholds() {
        let mut world = world_with_pawn();
        world.pawns.needs[0].set(HUNGER, 5.0);
        update_needs(&mut world);
        assert!(world.pawns.buffs[0].contains(HUNGRY));
        assert!(world.pawns.buffs[0].contains(STARVING));

        recompute_moods(&mut world);
        assert!(world.pawns.moods[0] < 0.0);

        world.pawns.needs[0].set(HUNGER, 100.0);
        update_needs(&mut world);
        assert!(!world.pawns.buffs[0].contains(HUNGRY));
        assert!(!world.pawns.buffs[0].contains(STARVING));
    }

    #[test]
    fn test_shared_threshold_buff_applies_once() {
        use crate::content::standard::{BORED, FUN};
        let mut world = world_with_pawn();
        world.pawns.needs[0].set(FUN, 15.0);
        update_needs(&mut world);
        assert!(world.pawns.buffs[0].contains(BORED));
        update_needs(&mut world);
        assert!(world.pawns.buffs[0].contains(BORED));

        world.pawns.needs[0].set(FUN, 1.0);
        update_needs(&mut world);
        assert_eq!(world.pawns.buffs[0].iter().filter(|b| b.buff == BORED).count(), 1);
    }

    #[test]
    fn test_mood_drops_debuff_once_need_recovers() {
        let mut world = world_with_pawn();
        world.pawns.needs[0].set(HUNGER, 5.0);
        update_needs(&mut world);
        recompute_moods(&mut world);
        assert!(world.pawns.buffs[0].contains(STARVING));

        // Raised mid-tick, after update_needs already ran
        world.pawns.needs[0].set(HUNGER, 50.0);
        recompute_moods(&mut world);
        assert!(!world.pawns.buffs[0].contains(HUNGRY));
        assert!(!world.pawns.buffs[0].contains(STARVING));
        assert_eq!(world.pawns.moods[0], 0.0);
    }

    #[test]
    fn test_needs_decay_each_tick() {
        let mut world = world_with_pawn();
        let before = world.pawns.needs[0].get(HUNGER).unwrap();
        update_needs(&mut world);
        assert!(world.pawns.needs[0].get(HUNGER).unwrap() < before);
    }
}
